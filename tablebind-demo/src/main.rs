use std::collections::HashMap;
use std::fs::File;
use std::time::Duration;

use chrono::NaiveDate;
use log::info;
use simplelog::{Config, LevelFilter, WriteLogger};
use tablebind::notify;
use tablebind::{
    CellValue, Collection, ColumnDef, FilterKind, FilterValue, MapScope, MemoryTable,
    MemoryTableFactory, RecordingCompiler, RowItem, TableOptions, TableSetup, drive,
};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
struct Ticket {
    title: String,
    owner: String,
    opened: NaiveDate,
}

fn ticket(title: &str, owner: &str, opened: (i32, u32, u32)) -> Ticket {
    Ticket {
        title: title.to_string(),
        owner: owner.to_string(),
        opened: NaiveDate::from_ymd_opt(opened.0, opened.1, opened.2).unwrap_or_default(),
    }
}

fn print_rows(label: &str, table: &MemoryTable<Ticket>) {
    println!("{label}:");
    for row in table.displayed_nodes() {
        let cells: Vec<String> = row.children().iter().map(|cell| cell.markup()).collect();
        println!("  {}", cells.join(" | "));
    }
}

#[tokio::main]
async fn main() {
    let log_file = File::create("tablebind-demo.log").expect("Failed to create log file");
    WriteLogger::init(LevelFilter::Debug, Config::default(), log_file)
        .expect("Failed to initialize logger");

    let tickets = Collection::from_values(vec![
        ticket("Login fails", "ana", (2024, 3, 1)),
        ticket("Slow search", "bo", (2024, 3, 4)),
        ticket("Broken export", "ana", (2024, 4, 2)),
    ]);
    let scope = MapScope::new();
    scope.bind("tickets", tickets.clone());

    let options = TableOptions::new(vec![
        ColumnDef::new("Title", |t: &Ticket| CellValue::from(t.title.as_str())),
        ColumnDef::new("Owner", |t: &Ticket| CellValue::from(t.owner.as_str()))
            .filter(FilterKind::Text),
        ColumnDef::new("Opened", |t: &Ticket| CellValue::from(t.opened))
            .filter(FilterKind::DateRange),
    ])
    .with_column_filters(true)
    .with_child_template("ticket-detail");
    let templates = HashMap::from([(
        "ticket-detail".to_string(),
        "<p>{{ticket.title}}</p>".to_string(),
    )]);

    let factory = MemoryTableFactory::new();
    let compiler = RecordingCompiler::new();
    let mut controller = match TableSetup::new(
        "ticket in tickets",
        options,
        scope.clone(),
        factory.clone(),
        compiler.clone(),
    )
    .with_templates(templates)
    .build()
    {
        Ok(controller) => controller,
        Err(e) => {
            eprintln!("Error: {}", e);
            return;
        }
    };

    let (sender, mut receiver) = notify::channel();
    tickets.install_notifier(sender);

    let cancel = CancellationToken::new();
    let host = {
        let cancel = cancel.clone();
        let tickets = tickets.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            tickets.push(RowItem::new(ticket("Crash on save", "cy", (2024, 4, 9))));
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        }
    };
    let (digests, ()) = tokio::join!(drive(&mut controller, &mut receiver, cancel), host);
    info!("Driver ran {} digests", digests);

    let Some(table) = factory.last() else {
        eprintln!("Error: no table was created");
        return;
    };
    print_rows("All tickets", &table);
    println!("Compiled {} nodes", compiler.records().len());
    println!("Owner suggestions for \"a\": {:?}", controller.suggestions(1, "a"));

    if let Err(e) = controller.set_filter_value(1, FilterValue::Text("ana".to_string())) {
        eprintln!("Error: {}", e);
    }
    controller.digest();
    print_rows("Owned by ana", &table);

    if let Some(first) = tickets.get(0) {
        controller.expand_row(&first);
        if let Some(child) = table.child(0) {
            println!("Detail of first ticket: {}", child.markup());
        }
    }

    controller.teardown();
}
