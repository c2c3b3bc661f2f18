//! 🍽️ Tables for humans. Same data as `--json`, with throw pillows.

use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::UTF8_FULL};
use rlx::client::{GetRollupCapsResponse, GetRollupJobResponse};

pub(crate) fn jobs_table(response: &GetRollupJobResponse) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "id",
        "state",
        "index_pattern",
        "rollup_index",
        "cron",
        "pages",
        "documents",
        "rollups",
        "triggers",
    ]);

    for job in &response.jobs {
        table.add_row(vec![
            Cell::new(job.config.id()),
            Cell::new(job.state()),
            Cell::new(job.config.index_pattern()),
            Cell::new(job.config.rollup_index()),
            Cell::new(job.config.cron()),
            Cell::new(job.stats.pages_processed).set_alignment(CellAlignment::Right),
            Cell::new(job.stats.documents_processed).set_alignment(CellAlignment::Right),
            Cell::new(job.stats.rollups_indexed).set_alignment(CellAlignment::Right),
            Cell::new(job.stats.trigger_count).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

pub(crate) fn caps_table(response: &GetRollupCapsResponse) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["index_pattern", "job", "rollup_index", "field", "aggregations"]);

    for (pattern, index_caps) in &response.caps {
        for job in &index_caps.rollup_jobs {
            for (field, field_caps) in &job.fields {
                let aggs: Vec<String> = field_caps.aggs.iter().map(ToString::to_string).collect();
                table.add_row(vec![
                    Cell::new(pattern),
                    Cell::new(&job.job_id),
                    Cell::new(&job.rollup_index),
                    Cell::new(field),
                    Cell::new(aggs.join("\n")),
                ]);
            }
        }
    }
    table
}
