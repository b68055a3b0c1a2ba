//! Bind a reactive collection to a tabular widget.
//!
//! A [`TableController`] watches a [`Collection`] in a host scope and keeps a
//! [`TableWidget`] in sync with it: rows are reconciled by identity instead
//! of being rebuilt, their templates are compiled in batches after the
//! widget renders them, and optional per-column filters narrow the rows.

pub mod binding;
pub mod collection;
pub mod config;
pub mod controller;
pub mod dom;
pub mod error;
pub mod filter;
pub mod lifecycle;
pub mod memory;
pub mod notify;
pub mod reconcile;
pub mod runtime;
pub mod scheduler;
pub mod widget;

pub use binding::{Binding, BindingChain};
pub use collection::{Collection, RowItem};
pub use config::{CellStyle, CellValue, ColumnDef, RenderKind, RowAttribute, TableOptions, TableSettings};
pub use controller::{DigestReport, TableController, TableId, TableSetup};
pub use dom::Node;
pub use error::{CompileError, ConfigError, FilterError};
pub use filter::{DateRange, FilterKind, FilterState, FilterValue, RangeBound};
pub use lifecycle::{LifecycleHooks, Subscription};
pub use memory::{MapScope, MemoryTable, MemoryTableFactory, RecordingCompiler};
pub use notify::{ChangeReceiver, ChangeSender};
pub use runtime::drive;
pub use scheduler::{Clock, CompileScheduler, DEFAULT_COMPILE_DELAY, ManualClock, SystemClock};
pub use widget::{HostScope, RowScope, TableHooks, TableWidget, TemplateCompiler, TemplateSource, WidgetFactory};
