use anyhow::{Context as _, bail};
use console::style;
use napthe_core::{CardInfo, PaymentApiClient};
use napthe_types::{ProviderReply, ReplyClass, StatusResponse, Telco, masking, messages};

use crate::Context;

#[derive(Debug, Clone, PartialEq, clap::Args)]
pub struct CheckCommand {
    /// Request id returned when the card was submitted
    pub request_id: String,

    /// Resend the original card so the provider matches the charge signature
    #[arg(long, requires = "code", requires = "serial", requires = "amount")]
    pub telco: Option<Telco>,

    #[arg(long, requires = "telco")]
    pub code: Option<String>,

    #[arg(long, requires = "telco")]
    pub serial: Option<String>,

    #[arg(long, requires = "telco")]
    pub amount: Option<i64>,

    /// Print the decoded reply as JSON
    #[arg(long)]
    pub json: bool,
}

impl CheckCommand {
    fn card_info(&self) -> Option<CardInfo> {
        Some(CardInfo {
            telco: self.telco?,
            code: self.code.clone()?.trim().to_string(),
            serial: self.serial.clone()?.trim().to_string(),
            amount: self.amount?,
        })
    }

    pub async fn execute(&self, ctx: &Context) -> anyhow::Result<()> {
        ctx.config
            .credentials()
            .context("Cannot query the provider without credentials")?;
        let client = PaymentApiClient::from_config(&ctx.config)?;

        let card = self.card_info();
        let response = client.check_status(&self.request_id, card.as_ref()).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&redacted(response.clone()))?);
        }
        print_status(&self.request_id, &response);

        if response.classify() == ReplyClass::Unreachable {
            bail!("Provider could not be reached");
        }
        Ok(())
    }
}

fn redacted(mut response: StatusResponse) -> StatusResponse {
    response.card_code = response.card_code.as_deref().map(masking::mask_code);
    response.card_serial = response.card_serial.as_deref().map(masking::mask_serial);
    response
}

fn print_status(request_id: &str, response: &StatusResponse) {
    let marker = match response.classify() {
        ReplyClass::Successful => style("✓").green(),
        ReplyClass::Pending | ReplyClass::Throttled => style("…").yellow(),
        ReplyClass::Failed | ReplyClass::Unreachable => style("✗").red(),
    };
    println!(
        "{} {} {}",
        marker,
        style(request_id).bold(),
        messages::strip_formatting(&response.friendly_message())
    );
    println!(
        "  {} {} ({})",
        style("Status:").dim(),
        response.status,
        response.status.code()
    );
    println!("  {} {}", style("Message:").dim(), response.message);
    if let Some(amount) = response.amount {
        println!("  {} {}", style("Amount:").dim(), amount);
    }
    if let Some(transaction_id) = &response.transaction_id {
        println!("  {} {}", style("Transaction:").dim(), transaction_id);
    }
}
