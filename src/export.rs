use chrono::Local;
use log::info;
use std::io::Write;
use std::path::Path;
use std::fs::File;

use crate::error::Result;
use crate::scraper::ContactRecord;

/// Writes one row per contact, ranked in discovery order.
pub fn write_csv<W: Write>(writer: W, records: &[ContactRecord]) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new().from_writer(writer);
    csv_writer.write_record(["rank", "title", "url", "emails", "timestamp"])?;

    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    for (i, record) in records.iter().enumerate() {
        let rank = (i + 1).to_string();
        csv_writer.write_record([
            rank.as_str(),
            record.title.as_str(),
            record.url.as_str(),
            record.emails_display().as_str(),
            timestamp.as_str(),
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn save_csv<P: AsRef<Path>>(path: P, records: &[ContactRecord]) -> Result<()> {
    let file = File::create(path.as_ref())?;
    write_csv(file, records)?;
    info!("Saved {} contacts to {:?}", records.len(), path.as_ref());
    Ok(())
}
