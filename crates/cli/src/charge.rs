use std::{sync::Arc, time::Duration};

use anyhow::{Context as _, bail};
use console::style;
use napthe_core::{ChargeRequest, SubmissionGuard};
use napthe_types::{CardPayment, ProviderReply, ReplyClass, Telco, format_denomination, messages};
use tokio::time::Instant;

use crate::{Context, host::ConsoleHost};

#[derive(Debug, Clone, PartialEq, clap::Args)]
pub struct ChargeCommand {
    /// Player credited for the card
    #[arg(long, short = 'p')]
    pub player: String,

    /// Card issuer (VIETTEL, VINA, MOBI, VIETNAMMOBI, ZING, GARENA, VCOIN, GATE)
    #[arg(long, short = 't')]
    pub telco: Telco,

    /// Declared card value in VND
    #[arg(long, short = 'a')]
    pub amount: i64,

    #[arg(long)]
    pub serial: String,

    #[arg(long)]
    pub code: String,

    /// Reuse a request id instead of generating one
    #[arg(long)]
    pub request_id: Option<String>,

    /// Keep reconciling until the payment resolves
    #[arg(long)]
    pub follow: bool,

    /// Stop following after this many seconds
    #[arg(long, default_value = "600")]
    pub max_wait: u64,
}

impl ChargeCommand {
    pub async fn execute(&self, ctx: &Context) -> anyhow::Result<()> {
        ctx.config
            .credentials()
            .context("Cannot charge cards without provider credentials")?;

        let mut request = ChargeRequest::new(
            &self.player,
            self.telco,
            &self.code,
            &self.serial,
            self.amount,
        );
        if let Some(request_id) = &self.request_id {
            request = request.with_request_id(request_id);
        }

        let guard = SubmissionGuard::new(ctx.config.form_cooldown());
        if let Err(rejected) = guard.check(&request) {
            println!("{}", messages::strip_formatting(&rejected.player_message()));
            return Err(rejected.into());
        }

        let host = Arc::new(ConsoleHost::new(ctx.config.bonus));
        let (registry, mut runner) = napthe_core::bootstrap(&ctx.config, host)?;

        println!(
            "{} {} {} for {}",
            style("Submitting").dim(),
            style(self.telco.display_name()).bold(),
            style(format_denomination(self.amount)).bold(),
            style(&self.player).cyan()
        );
        println!("  {} {}", style("Request:").dim(), request.request_id);

        let request_id = request.request_id.clone();
        let response = registry.submit(request).await?;
        let shown = messages::strip_formatting(&response.friendly_message());

        match response.classify() {
            ReplyClass::Successful | ReplyClass::Pending => {
                println!("{} {}", style("✓").green(), shown);
            }
            class => {
                println!("{} {}", style("✗").red(), shown);
                bail!(
                    "Charge not accepted ({:?}, status {}, message {:?})",
                    class,
                    response.status,
                    response.message
                );
            }
        }

        if !self.follow {
            println!(
                "  {}",
                style("Pass --follow to wait for the final result").dim()
            );
            return Ok(());
        }

        let sweep = registry.start_periodic_sweep();
        let deadline = Instant::now() + Duration::from_secs(self.max_wait);
        println!(
            "{} every {}s",
            style("Reconciling").dim(),
            registry.policy().interval.as_secs()
        );

        let outcome = loop {
            if registry.get_payment(&request_id).is_none() {
                break Ok(());
            }
            match tokio::time::timeout_at(deadline, runner.run_next()).await {
                Ok(Some(resolved)) => resolved.iter().for_each(print_outcome),
                Ok(None) => break Ok(()),
                Err(_) => {
                    break Err(anyhow::anyhow!(
                        "Payment {} still pending after {}s",
                        request_id,
                        self.max_wait
                    ));
                }
            }
        };
        sweep.abort();
        outcome
    }
}

fn print_outcome(payment: &CardPayment) {
    if payment.is_successful() {
        println!(
            "{} {} credited {}",
            style("✓").green(),
            payment.request_id(),
            format_denomination(payment.processed_amount().unwrap_or_default())
        );
    } else {
        println!(
            "{} {} failed: {}",
            style("✗").red(),
            payment.request_id(),
            payment.fail_reason().unwrap_or_default()
        );
    }
    if let Ok(json) = serde_json::to_string(payment) {
        println!("  {}", style(json).dim());
    }
}
