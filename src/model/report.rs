//! Read-only views of spending against limits.

use crate::model::{Amount, Month};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Spending and the resolved limit for one month.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct MonthSummary {
    pub month: Month,
    pub spent: Amount,
    pub limit: Amount,
}

impl MonthSummary {
    /// What is left of the limit. Negative when the month is over.
    pub fn remaining(&self) -> Amount {
        self.limit - self.spent
    }

    pub fn is_over(&self) -> bool {
        self.spent > self.limit
    }
}

/// One row per month, oldest first.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Overview {
    pub months: Vec<MonthSummary>,
}

impl Display for Overview {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.months.is_empty() {
            return write!(f, "No spending has been recorded");
        }
        let mut table = TextTable::new(["Month", "Spent", "Limit", "Remaining"]);
        for m in &self.months {
            let flag = if m.is_over() { " !" } else { "" };
            table.push([
                m.month.to_string(),
                m.spent.to_string(),
                m.limit.to_string(),
                format!("{}{flag}", m.remaining()),
            ]);
        }
        write!(f, "{table}")
    }
}

/// Per-day, per-category totals for a single month.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct MonthDetail {
    pub summary: MonthSummary,
    /// Column headers, sorted by name.
    pub categories: Vec<String>,
    /// One row for every day of the month, including days with no spending.
    pub days: Vec<DayRow>,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct DayRow {
    pub date: NaiveDate,
    /// Parallel to `MonthDetail::categories`.
    pub amounts: Vec<Amount>,
}

impl DayRow {
    pub fn total(&self) -> Amount {
        self.amounts.iter().copied().sum()
    }
}

impl Display for MonthDetail {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = &self.summary;
        writeln!(
            f,
            "Month {}: spent {} of {} ({} remaining)",
            s.month,
            s.spent,
            s.limit,
            s.remaining()
        )?;
        let mut headers = vec!["Day".to_string()];
        headers.extend(self.categories.iter().cloned());
        headers.push("Total".to_string());
        let mut table = TextTable::new(headers);
        for day in &self.days {
            let mut row = vec![day.date.format("%d").to_string()];
            row.extend(day.amounts.iter().map(|a| a.to_string()));
            row.push(day.total().to_string());
            table.push(row);
        }
        write!(f, "{table}")
    }
}

/// A minimal markdown table renderer for command output.
pub(crate) struct TextTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TextTable {
    pub(crate) fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub(crate) fn push<S: Into<String>>(&mut self, row: impl IntoIterator<Item = S>) {
        self.rows.push(row.into_iter().map(Into::into).collect());
    }

    fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                if let Some(w) = widths.get_mut(i) {
                    *w = (*w).max(cell.chars().count());
                }
            }
        }
        widths
    }
}

impl Display for TextTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let widths = self.widths();
        write_row(f, &widths, &self.headers)?;
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        write_row(f, &widths, &rule)?;
        for row in &self.rows {
            write_row(f, &widths, row)?;
        }
        Ok(())
    }
}

fn write_row(f: &mut Formatter<'_>, widths: &[usize], cells: &[String]) -> std::fmt::Result {
    write!(f, "|")?;
    for (i, width) in widths.iter().copied().enumerate() {
        let cell = cells.get(i).map(String::as_str).unwrap_or("");
        write!(f, " {cell:<width$} |")?;
    }
    writeln!(f)
}
