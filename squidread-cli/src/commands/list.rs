//! List command implementation

use super::Context;
use anyhow::Result;
use squidread_core::BookSummary;

/// Print the library, most recently used first
pub async fn list(ctx: &Context, json: bool) -> Result<()> {
    let records = ctx.library.list().await?;
    let books: Vec<BookSummary> = records.iter().map(BookSummary::from).collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&books)?);
        return Ok(());
    }

    if books.is_empty() {
        println!("Library is empty");
        return Ok(());
    }

    for book in &books {
        println!(
            "{}  {}  ({}, {} KB{})",
            book.id,
            book.title,
            book.last_opened.format("%Y-%m-%d %H:%M"),
            book.size.div_ceil(1024),
            if book.has_cover { ", cover" } else { "" }
        );
    }
    println!("{} book(s)", books.len());
    Ok(())
}
