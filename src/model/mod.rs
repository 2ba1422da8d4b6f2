//! Types that represent the core data model, such as `Month`, `Category` and `Spending`.
mod amount;
mod category;
mod month;
mod report;
mod spending;

pub use amount::{Amount, AmountError};
pub use category::Category;
pub(crate) use category::clean_name;
pub use month::{month_key, Month, MonthInput};
pub(crate) use report::TextTable;
pub use report::{DayRow, MonthDetail, MonthSummary, Overview};
pub use spending::{NewSpending, Spending};
