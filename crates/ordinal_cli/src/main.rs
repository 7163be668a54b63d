//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `ordinal_core` linkage.
//! - Exercise append, bulk insert, reorder and soft delete against an
//!   in-memory database and print the resulting order.
//!
//! Output is deterministic apart from generated ids, which are not printed.

use ordinal_core::db::open_db_in_memory;
use ordinal_core::{
    BulkInsertEntry, OrderResult, OrderingService, ParentId, SqliteOrderedItemRepository,
};
use std::process::ExitCode;
use uuid::Uuid;

fn main() -> ExitCode {
    println!("ordinal_core ping={}", ordinal_core::ping());
    println!("ordinal_core version={}", ordinal_core::core_version());

    match run_demo() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("demo failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run_demo() -> Result<(), Box<dyn std::error::Error>> {
    let conn = open_db_in_memory()?;
    let service = OrderingService::new(SqliteOrderedItemRepository::try_new(&conn)?);
    let board = Uuid::new_v4();
    service.register_parent(board)?;

    let todo = service.create_appended(board, "Todo")?;
    service.create_appended(board, "Doing")?;
    service.bulk_insert(&[
        BulkInsertEntry::new(board, 2, "Archive"),
        BulkInsertEntry::new(board, 1, "Done"),
    ])?;
    print_order(&service, board, "after append + import")?;

    service.reorder(todo.public_id, 2)?;
    print_order(&service, board, "after moving Todo to 2")?;

    service.soft_delete(todo.public_id, "cli", 0)?;
    print_order(&service, board, "after deleting Todo")?;
    Ok(())
}

fn print_order(
    service: &OrderingService<SqliteOrderedItemRepository<'_>>,
    parent: ParentId,
    label: &str,
) -> OrderResult<()> {
    let listed = service
        .list_active(parent)?
        .into_iter()
        .map(|item| format!("{}={}", item.payload, item.index))
        .collect::<Vec<_>>()
        .join(" ");
    println!("{label}: {listed}");
    Ok(())
}
