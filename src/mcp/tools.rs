//! The MCP tools. Each one is a thin wrapper around the command handler of the same purpose.

use crate::args::{
    AddCategoryArgs, AddSpendingArgs, LimitRangeArgs, ListSpendingArgs, MonthArgs, SetLimitArgs,
    UpdateSettingsArgs,
};
use crate::commands;
use crate::mcp::mcp_utils::tool_result;
use crate::mcp::SpendServer;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::CallToolResult;
use rmcp::ErrorData as McpError;
use rmcp::{tool, tool_router};
use tracing::info;

#[tool_router(vis = "pub(super)")]
impl SpendServer {
    #[tool]
    /// Initialize the spend MCP service for this session and return usage instructions. You
    /// **MUST** call this **ONCE** before using other tools so that you have the full usage
    /// instructions. You **MAY** call it more than once if you have forgotten the usage
    /// instructions.
    async fn initialize_service(&self) -> Result<CallToolResult, McpError> {
        let mut initialized = self.initialized.lock().await;
        *initialized = true;
        Ok(CallToolResult::success(vec![rmcp::model::Content::text(
            include_str!("docs/INSTRUCTIONS.md"),
        )]))
    }

    /// Add a spending category.
    ///
    /// # Parameters
    ///
    /// - `name`: The category name. Surrounding whitespace is removed. It must not be empty and
    ///   must not already exist.
    ///
    /// # Returns
    ///
    /// The new category with its `id`.
    ///
    /// # Example
    ///
    /// ```json
    /// { "name": "Groceries" }
    /// ```
    #[tool]
    async fn add_category(
        &self,
        Parameters(args): Parameters<AddCategoryArgs>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        let config = self.config.read().await;
        tool_result(commands::add_category(&config, args).await)
    }

    /// List all categories, ordered by name. Spending can only be added to an existing category.
    #[tool]
    async fn list_categories(&self) -> Result<CallToolResult, McpError> {
        require_init!(self);
        let config = self.config.read().await;
        tool_result(commands::list_categories(&config).await)
    }

    /// Add a spending entry and check its month against the month's limit.
    ///
    /// The entry's month is derived from its date. After the entry is stored, the month's total is
    /// compared with its limit (the month's own limit if one was set, otherwise the default limit):
    ///
    /// - At or under the limit: nothing else happens. The outcome is `within_limit`.
    /// - Over the limit in adaptive mode: the amount over is subtracted from the following
    ///   month's limit. The outcome is `carried` and includes `next_limit`.
    /// - Over the limit in fixed mode: nothing else is changed. The outcome is `raise_required`.
    ///   Ask the user whether to raise the month's limit with `update_month_limit`.
    ///
    /// The entry and any limit change are saved together or not at all.
    ///
    /// # Parameters
    ///
    /// - `category`: The name of an existing category. **Required.**
    /// - `amount`: The amount spent, as a string or number. Must not be negative. Rounded to
    ///   cents. **Required.**
    /// - `date`: The day as `YYYY-MM-DD`. Defaults to today.
    ///
    /// # Example
    ///
    /// ```json
    /// { "category": "Groceries", "amount": "42.10", "date": "2025-01-20" }
    /// ```
    #[tool]
    async fn add_spending(
        &self,
        Parameters(args): Parameters<AddSpendingArgs>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        info!("MCP: add_spending called for {}", args.category);
        let config = self.config.read().await;
        tool_result(commands::add_spending(&config, args).await)
    }

    /// List the spending entries of one month with their category names.
    ///
    /// # Parameters
    ///
    /// - `month`: The month as `YYYY.M` or `YYYY-MM`. Defaults to the current month.
    /// - `format`: `table` (default), `csv` or `json`.
    #[tool]
    async fn list_spending(
        &self,
        Parameters(args): Parameters<ListSpendingArgs>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        let config = self.config.read().await;
        tool_result(commands::list_spending(&config, args).await)
    }

    /// Report spending, limit and remaining amount for every month that has spending, oldest
    /// first. A negative remaining amount means the month is over its limit.
    #[tool]
    async fn month_report(&self) -> Result<CallToolResult, McpError> {
        require_init!(self);
        let config = self.config.read().await;
        tool_result(commands::report(&config).await)
    }

    /// Show one month in detail: a row for every day, a column for every category, and each
    /// cell holding that day's spending in that category. Also returns the month's limit and
    /// total.
    ///
    /// # Parameters
    ///
    /// - `month`: The month as `YYYY.M` or `YYYY-MM`, e.g. `2025.1`. **Required.**
    #[tool]
    async fn month_detail(
        &self,
        Parameters(args): Parameters<MonthArgs>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        let config = self.config.read().await;
        tool_result(commands::month_detail(&config, args).await)
    }

    /// Show the current month's spending, limit and remaining amount.
    #[tool]
    async fn current_status(&self) -> Result<CallToolResult, McpError> {
        require_init!(self);
        let config = self.config.read().await;
        tool_result(commands::status(&config).await)
    }

    /// Set the limit of a single month.
    ///
    /// The limit is rounded to cents and must be at least what the month has already spent,
    /// otherwise the call fails and nothing changes.
    ///
    /// # Parameters
    ///
    /// - `month`: The month as `YYYY.M` or `YYYY-MM`. **Required.**
    /// - `limit`: The new limit. **Required.**
    ///
    /// # Example
    ///
    /// ```json
    /// { "month": "2025.1", "limit": "1500" }
    /// ```
    #[tool]
    async fn update_month_limit(
        &self,
        Parameters(args): Parameters<SetLimitArgs>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        let config = self.config.read().await;
        tool_result(commands::set_limit(&config, args).await)
    }

    /// Set the same limit for every month in a range, replacing any limits those months had.
    ///
    /// # Parameters
    ///
    /// - `from`: The first month. **Required.**
    /// - `to`: The last month, inclusive. Must be after `from`. When omitted only `from` is set.
    /// - `limit`: The limit for every month in the range. **Required.**
    ///
    /// # Errors
    ///
    /// - Fails with an invalid range error if `to` is not after `from`. Nothing is written.
    ///
    /// # Example
    ///
    /// ```json
    /// { "from": "2024.11", "to": "2025.2", "limit": "300" }
    /// ```
    #[tool]
    async fn set_limit_range(
        &self,
        Parameters(args): Parameters<LimitRangeArgs>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        let config = self.config.read().await;
        tool_result(commands::set_limit_range(&config, args).await)
    }

    /// Show the default monthly limit and whether adaptive mode is on.
    #[tool]
    async fn get_settings(&self) -> Result<CallToolResult, McpError> {
        require_init!(self);
        let config = self.config.read().await;
        tool_result(commands::show_settings(&config).await)
    }

    /// Change the default monthly limit, adaptive mode or both. Settings that are not given keep
    /// their current value. Changing the default limit does not touch months that have their own
    /// limit.
    ///
    /// # Parameters
    ///
    /// - `default_limit`: The new default limit.
    /// - `adaptive`: `true` to carry overspend into the next month, `false` to require raising
    ///   the month's limit instead.
    #[tool]
    async fn update_settings(
        &self,
        Parameters(args): Parameters<UpdateSettingsArgs>,
    ) -> Result<CallToolResult, McpError> {
        require_init!(self);
        let mut config = self.config.write().await;
        tool_result(commands::update_settings(&mut config, args).await)
    }
}
