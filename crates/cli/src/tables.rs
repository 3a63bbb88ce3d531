use comfy_table::{
    ContentArrangement, Row, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL_CONDENSED,
};
use quickpack::{progress_reporter::ProgressReporter, validation::ValidationIssue};

fn styled_table(header: Vec<&'static str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

pub(crate) struct ValidationTableReporter {
    table: Table,
}

impl ValidationTableReporter {
    pub(crate) fn new() -> Self {
        Self {
            table: styled_table(vec!["Category", "Field", "Message", "Suggestion"]),
        }
    }

    pub(crate) fn add_validation_errors<'a>(
        &mut self,
        error_issues: impl Iterator<Item = &'a ValidationIssue>,
        reporter: &impl ProgressReporter,
    ) -> &mut Self {
        self.add_issues(error_issues, |category| reporter.format_error(category))
    }

    pub(crate) fn add_validation_warnings<'a>(
        &mut self,
        warning_issues: impl Iterator<Item = &'a ValidationIssue>,
        reporter: &impl ProgressReporter,
    ) -> &mut Self {
        self.add_issues(warning_issues, |category| reporter.format_warning(category))
    }

    fn add_issues<'a>(
        &mut self,
        issues: impl Iterator<Item = &'a ValidationIssue>,
        style_category: impl Fn(String) -> String,
    ) -> &mut Self {
        for issue in issues {
            self.table.add_row(vec![
                style_category(issue.category().to_string()),
                issue.field().to_string(),
                issue.message().to_string(),
                issue.suggestion().cloned().unwrap_or_default(),
            ]);
        }

        self
    }

    pub(crate) fn print(&self) {
        eprintln!("{}", &self.table);
    }
}

pub(crate) struct PlanTableReporter {
    table: Table,
}

impl PlanTableReporter {
    pub(crate) fn new() -> Self {
        Self {
            table: styled_table(vec!["#", "Step", "Kind", "Description", "Options"]),
        }
    }

    pub(crate) fn add_row<T: Into<Row>>(&mut self, row: T) -> &mut Self {
        self.table.add_row(row);
        self
    }

    pub(crate) fn print(&self) {
        println!("{}", &self.table);
    }
}
