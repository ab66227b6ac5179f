//! Skill command - list and invoke skill functions directly.

use anyhow::Result;
use clap::{Args, Subcommand};
use console::{Style, style};
use serde_json::Value;

use super::{Context, params_from, parse_param, print_header, print_json, render_value};

/// Arguments for the skill command.
#[derive(Args, Debug)]
pub struct SkillArgs {
    #[command(subcommand)]
    pub command: SkillCommand,
}

#[derive(Subcommand, Debug)]
pub enum SkillCommand {
    /// List registered skills and their functions
    List,

    /// Invoke one skill function
    Run {
        /// Skill name (e.g. SummarizationSkill)
        skill: String,

        /// Function name (e.g. summarize_text)
        function: String,

        /// Function parameter (repeatable)
        #[arg(short, long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
        params: Vec<(String, Value)>,
    },
}

/// Run the skill command.
pub async fn run(args: SkillArgs, ctx: &Context) -> Result<()> {
    match args.command {
        SkillCommand::List => cmd_list(ctx),
        SkillCommand::Run {
            skill,
            function,
            params,
        } => cmd_run(&skill, &function, params, ctx).await,
    }
}

fn cmd_list(ctx: &Context) -> Result<()> {
    let app = ctx.app()?;
    let skills = app.orchestrator.skills().list();

    if ctx.json_output {
        return print_json(&skills);
    }

    let dim = Style::new().dim();
    print_header("Skills");
    for skill in &skills {
        println!();
        println!("  {}", style(&skill.name).bold());
        for function in &skill.functions {
            println!(
                "    {} {}",
                style(&function.name).cyan(),
                dim.apply_to(&function.description)
            );
        }
    }
    if app.llm.is_none() {
        println!();
        println!(
            "{}",
            dim.apply_to("CompletionSkill is unavailable: no usable [llm] configuration")
        );
    }
    Ok(())
}

async fn cmd_run(
    skill: &str,
    function: &str,
    params: Vec<(String, Value)>,
    ctx: &Context,
) -> Result<()> {
    let app = ctx.app()?;
    let output = app
        .orchestrator
        .skills()
        .invoke(skill, function, params_from(params))
        .await?;

    if ctx.json_output {
        return print_json(&output);
    }
    println!("{}", render_value(&output)?);
    Ok(())
}
