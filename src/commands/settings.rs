use crate::args::UpdateSettingsArgs;
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::limits::LimitPolicy;
use crate::{Config, Result};

fn describe(policy: &LimitPolicy) -> String {
    let mode = if policy.adaptive_limit {
        "on: overspend is subtracted from the next month's limit"
    } else {
        "off: overspend must be covered by raising the month's limit"
    };
    format!(
        "Default limit: {}\nAdaptive mode: {mode}",
        policy.default_limit
    )
}

pub async fn show_settings(config: &Config) -> Result<Out<LimitPolicy>> {
    let policy = config.policy();
    Ok(Out::new(describe(&policy), policy))
}

/// Changes the settings that are given and keeps the rest, then rewrites `config.json`. `config`
/// only changes once the file has been written.
pub async fn update_settings(
    config: &mut Config,
    args: UpdateSettingsArgs,
) -> Result<Out<LimitPolicy>> {
    let current = config.policy();
    let default_limit = args
        .default_limit
        .unwrap_or(current.default_limit)
        .validated()?;
    let policy = LimitPolicy::new(
        default_limit,
        args.adaptive.unwrap_or(current.adaptive_limit),
    );
    config
        .update_policy(policy)
        .await
        .pub_result(ErrorType::Config)?;
    let policy = config.policy();
    Ok(Out::new(
        format!("Settings updated\n{}", describe(&policy)),
        policy,
    ))
}
