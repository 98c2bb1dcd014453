use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use command_core::{command_url, default_checks, IntakeState};
use shared::{
    domain::{CommandSource, RiskLevel, Stage},
    protocol::CommandPayload,
};

#[derive(Parser, Debug)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a command-execution url carrying the given command.
    Encode {
        #[arg(long, default_value = "http://localhost:3000/command-execution")]
        base: String,
        #[arg(long)]
        equipment_id: Option<String>,
        #[arg(long)]
        equipment_name: String,
        #[arg(long)]
        plant_id: Option<String>,
        #[arg(long)]
        plant_name: Option<String>,
        #[arg(long)]
        parameter: Option<String>,
        #[arg(long)]
        current_value: Option<f64>,
        #[arg(long)]
        target_value: f64,
        #[arg(long)]
        unit: Option<String>,
        #[arg(long, default_value = "medium")]
        risk_level: RiskLevel,
        #[arg(long, default_value = "manual")]
        source: CommandSource,
        #[arg(long)]
        reasoning: Option<String>,
        #[arg(long)]
        root_cause: Option<String>,
    },
    /// Run intake on a url and print the decoded command.
    Decode { location: String },
    /// List the preflight checks in visiting order.
    Checks,
    /// List the pipeline stages in order.
    Stages,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Encode {
            base,
            equipment_id,
            equipment_name,
            plant_id,
            plant_name,
            parameter,
            current_value,
            target_value,
            unit,
            risk_level,
            source,
            reasoning,
            root_cause,
        } => {
            let descriptor = CommandPayload {
                equipment_id,
                equipment_name: Some(equipment_name),
                plant_id,
                plant_name,
                parameter_name: parameter,
                current_value,
                target_value: Some(target_value),
                unit,
                risk_level: Some(risk_level),
                source: Some(source),
                reasoning,
                root_cause,
            }
            .into_descriptor()?;
            println!("{}", command_url(&base, &descriptor)?);
        }
        Command::Decode { location } => match IntakeState::from_location(&location) {
            IntakeState::Ready(descriptor) => {
                println!("{}", serde_json::to_string_pretty(&descriptor)?);
                if descriptor.requires_reason() {
                    println!("override reason required ({} risk)", descriptor.risk_level);
                }
            }
            IntakeState::NoCommandData(err) => {
                println!("No Command Data");
                bail!("{err}");
            }
        },
        Command::Checks => {
            for check in default_checks() {
                let marker = if check.id.is_critical() { "critical" } else { "" };
                println!("{:<11} {:<28} {marker}", check.id, check.label);
            }
        }
        Command::Stages => {
            for stage in Stage::ORDER {
                println!("{:>2}. {:<14} {}", stage.index(), stage, stage.label());
            }
        }
    }

    Ok(())
}
