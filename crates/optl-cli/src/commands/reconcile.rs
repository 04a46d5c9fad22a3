//! `optl reconcile`: one reconciliation session against the configured
//! account endpoint, printed line by line on stdout.

use std::process::ExitCode;

use anyhow::{bail, Result};
use optl_account::{AccountVariant, HttpAccountClient};
use optl_config::{resolve_secrets, PollerConfig};
use optl_poller::{spawn_reconciliation, Baseline};
use optl_reconcile::{AccountSnapshot, SessionStatus, SessionView, SuccessCriterion, ViewAction};
use tracing::info;

use super::load_cli_config;

pub struct ReconcileArgs {
    pub config_paths: Vec<String>,
    pub baseline_credits: Option<i64>,
    pub target_plan: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Timeout,
    Interrupted,
}

impl Outcome {
    pub fn exit_code(self) -> ExitCode {
        match self {
            Outcome::Success => ExitCode::SUCCESS,
            Outcome::Timeout => ExitCode::from(2),
            Outcome::Interrupted => ExitCode::from(130),
        }
    }
}

pub async fn run(args: ReconcileArgs) -> Result<Outcome> {
    let (loaded, cfg) = load_cli_config(&args.config_paths)?;
    let secrets = resolve_secrets(&loaded.config_json)?;
    let variant = AccountVariant::parse(&cfg.account.variant)?;

    let criterion = criterion_for(variant, &cfg, args.target_plan.as_deref());
    let baseline = match (variant, args.baseline_credits) {
        (AccountVariant::Credits, Some(n)) => Baseline::Known(AccountSnapshot::credits(n)),
        (AccountVariant::Subscription, Some(_)) => {
            bail!("--baseline-credits requires /account/variant=credits")
        }
        (_, None) => Baseline::FetchFirst,
    };

    let mut client = HttpAccountClient::new(cfg.account.base_url.clone(), variant)
        .with_request_timeout(cfg.request_timeout());
    if let Some(token) = secrets.api_token {
        client = client.with_bearer_token(token);
    }

    println!("config_hash={}", loaded.config_hash);
    println!(
        "variant={} interval_ms={} deadline_ms={}",
        variant.as_str(),
        cfg.poll.interval_ms,
        cfg.poll.deadline_ms
    );
    info!(?criterion, "starting reconciliation");

    let handle = spawn_reconciliation(client, criterion, baseline, cfg.timing());
    let mut rx = handle.subscribe();

    let status = loop {
        let view = rx.borrow_and_update().clone();
        print_view(&view);
        if view.status.is_terminal() {
            break view.status;
        }

        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    let view = rx.borrow().clone();
                    if view.status.is_terminal() {
                        print_view(&view);
                    }
                    break view.status;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                handle.cancel();
                eprintln!("interrupted; reconciliation cancelled");
                return Ok(Outcome::Interrupted);
            }
        }
    };

    Ok(match status {
        SessionStatus::Success => Outcome::Success,
        SessionStatus::Timeout => Outcome::Timeout,
        SessionStatus::Polling => Outcome::Interrupted,
    })
}

/// Credits variant waits for a balance increase; subscription variant waits
/// for an active plan, optionally a specific tier.
fn criterion_for(
    variant: AccountVariant,
    cfg: &PollerConfig,
    target_plan: Option<&str>,
) -> SuccessCriterion {
    match variant {
        AccountVariant::Credits => SuccessCriterion::CreditsIncreased,
        AccountVariant::Subscription => {
            let plan = target_plan
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .or_else(|| cfg.target_plan());
            SuccessCriterion::SubscriptionActive {
                target_plan: plan.map(str::to_string),
            }
        }
    }
}

fn print_view(view: &SessionView<AccountSnapshot>) {
    match view.status {
        SessionStatus::Polling => println!(
            "status=polling ticks={} failed_reads={} current={}",
            view.ticks,
            view.failed_reads,
            describe(view.current.as_ref())
        ),
        _ => {
            let actions: Vec<&str> = view.actions.iter().map(ViewAction::as_str).collect();
            println!(
                "status={} resolved_after_ms={} ticks={} failed_reads={} actions={}",
                view.status,
                view.resolved_after_ms.unwrap_or_default(),
                view.ticks,
                view.failed_reads,
                actions.join(",")
            );
        }
    }
}

fn describe(snap: Option<&AccountSnapshot>) -> String {
    match snap {
        None => "-".to_string(),
        Some(AccountSnapshot::Credits { available_credits }) => {
            format!("credits:{available_credits}")
        }
        Some(AccountSnapshot::Subscription { status, plan }) => format!(
            "subscription:{:?}:{}",
            status,
            plan.as_deref().unwrap_or("-")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_target_plan_overrides_config() {
        let cfg: PollerConfig = PollerConfig::from_config_json(&serde_json::json!({
            "account": {"variant": "subscription"},
            "target": {"plan": "starter"}
        }))
        .unwrap();

        assert_eq!(
            criterion_for(AccountVariant::Subscription, &cfg, Some("pro")),
            SuccessCriterion::SubscriptionActive {
                target_plan: Some("pro".to_string())
            }
        );
        assert_eq!(
            criterion_for(AccountVariant::Subscription, &cfg, Some("  ")),
            SuccessCriterion::SubscriptionActive {
                target_plan: Some("starter".to_string())
            }
        );
    }

    #[test]
    fn credits_variant_ignores_target_plan() {
        let cfg = PollerConfig::default();
        assert_eq!(
            criterion_for(AccountVariant::Credits, &cfg, Some("pro")),
            SuccessCriterion::CreditsIncreased
        );
    }

    #[test]
    fn describe_formats_snapshots() {
        assert_eq!(describe(None), "-");
        assert_eq!(describe(Some(&AccountSnapshot::credits(42))), "credits:42");
    }
}
