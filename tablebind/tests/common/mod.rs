#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tablebind::{
    CellValue, Collection, ColumnDef, FilterKind, ManualClock, MapScope, MemoryTable,
    MemoryTableFactory, RecordingCompiler, RowItem, TableController, TableOptions, TableSetup,
};

pub const EXPRESSION: &str = "request in requests";
pub const DETAIL_MARKUP: &str = "<div>{{request.name}}</div>";
pub const ACTIONS_MARKUP: &str = "<button>open</button>";

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub name: String,
    pub category: String,
    pub due: NaiveDate,
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn request(name: &str, category: &str, due: NaiveDate) -> Request {
    Request {
        name: name.to_string(),
        category: category.to_string(),
        due,
    }
}

/// Six requests in June 2020, categories alternating a/b.
pub fn requests() -> Vec<Request> {
    (0..6)
        .map(|i| {
            let category = if i % 2 == 0 { "a" } else { "b" };
            request(&format!("r{i}"), category, date(2020, 6, 10 + i))
        })
        .collect()
}

/// Columns: name, category (text filter), due (date range filter).
pub fn options() -> TableOptions<Request> {
    TableOptions::new(vec![
        ColumnDef::new("Name", |r: &Request| CellValue::from(r.name.as_str())),
        ColumnDef::new("Category", |r: &Request| CellValue::from(r.category.as_str()))
            .filter(FilterKind::Text),
        ColumnDef::new("Due", |r: &Request| CellValue::from(r.due)).filter(FilterKind::DateRange),
    ])
}

pub fn templates() -> HashMap<String, String> {
    HashMap::from([
        ("detail.html".to_string(), DETAIL_MARKUP.to_string()),
        ("actions.html".to_string(), ACTIONS_MARKUP.to_string()),
    ])
}

pub type Controller = TableController<Request, MapScope<Request>>;

pub struct Fixture {
    pub scope: MapScope<Request>,
    pub factory: MemoryTableFactory<Request>,
    pub compiler: RecordingCompiler,
    pub clock: ManualClock,
    pub collection: Collection<Request>,
}

impl Fixture {
    pub fn new(values: Vec<Request>) -> Self {
        let scope = MapScope::new();
        let collection = Collection::from_values(values);
        scope.bind("requests", collection.clone());
        Self {
            scope,
            factory: MemoryTableFactory::new(),
            compiler: RecordingCompiler::new(),
            clock: ManualClock::new(),
            collection,
        }
    }

    pub fn setup(&self, options: TableOptions<Request>) -> TableSetup<Request, MapScope<Request>> {
        TableSetup::new(
            EXPRESSION,
            options,
            self.scope.clone(),
            self.factory.clone(),
            self.compiler.clone(),
        )
        .with_clock(Arc::new(self.clock.clone()))
        .with_templates(templates())
    }

    pub fn controller(&self, options: TableOptions<Request>) -> Controller {
        self.setup(options).build().unwrap()
    }

    /// The most recently created widget.
    pub fn table(&self) -> MemoryTable<Request> {
        self.factory.last().unwrap()
    }

    /// Let the scheduled compile flush become due.
    pub fn elapse(&self) {
        self.clock.advance(Duration::from_millis(10));
    }

    /// Digest, let the flush become due and digest again.
    pub fn settle(&self, controller: &mut Controller) {
        controller.digest();
        self.elapse();
        controller.digest();
    }

    pub fn item(&self, index: usize) -> RowItem<Request> {
        self.collection.get(index).unwrap()
    }

    pub fn names(&self) -> Vec<String> {
        self.collection
            .snapshot()
            .iter()
            .map(|item| item.with(|r| r.name.clone()))
            .collect()
    }
}

/// Identities of `items` in order.
pub fn identities<T>(items: &[RowItem<T>]) -> Vec<Option<usize>> {
    items.iter().map(RowItem::identity).collect()
}

/// `Some(0)..Some(n - 1)`.
pub fn contiguous(n: usize) -> Vec<Option<usize>> {
    (0..n).map(Some).collect()
}
