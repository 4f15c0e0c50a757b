//! Start command for beginning a new countdown.

use std::io::Write;

use anyhow::Result;
use clap::Args;

use ct_core::{Clock, EventLog, StartRequest, Tags, TimerService};

use crate::Config;
use crate::commands::util::{handle_timer_error, parse_duration_minutes, quoted, report_write_error};

#[derive(Debug, Args)]
pub struct StartArgs {
    /// What the countdown is for.
    pub title: String,
    /// Tag the session (repeatable).
    #[arg(short = 't', long = "tag")]
    pub tag: Vec<String>,
    /// Additional tags as a comma-separated list.
    #[arg(long)]
    pub tags: Option<String>,
    /// Optional longer description.
    #[arg(short, long)]
    pub description: Option<String>,
    /// Countdown length: minutes (25) or a duration like 25m, 1h, 1h30m.
    #[arg(short, long)]
    pub minutes: Option<String>,
}

impl StartArgs {
    /// Tags from `--tag` and `--tags`, merged. Commas split tags in both.
    fn collect_tags(&self) -> Tags {
        let mut tags: Tags = self.tag.iter().collect();
        tags.merge(self.tags.as_deref());
        tags
    }
}

pub fn run<W: Write, L: EventLog, C: Clock>(
    writer: &mut W,
    service: &mut TimerService<L, C>,
    args: &StartArgs,
    config: &Config,
) -> Result<()> {
    let duration_minutes = match &args.minutes {
        Some(minutes) => parse_duration_minutes(minutes)?,
        None => config.default_duration_minutes,
    };
    let request = StartRequest {
        title: args.title.clone(),
        tags: args.collect_tags(),
        description: args.description.clone().unwrap_or_default(),
        duration_minutes,
    };

    let outcome = match service.start_timer(request) {
        Ok(outcome) => outcome,
        Err(err) => return handle_timer_error(writer, err),
    };

    if let Some(active) = service.active() {
        writeln!(
            writer,
            "Started {} ({} min).",
            quoted(&active.info.title),
            active.info.duration_minutes
        )?;
        if !active.info.tags.is_empty() {
            writeln!(writer, "Tags: {}", active.info.tags)?;
        }
    }
    writeln!(writer, "Run `ct watch` to follow the countdown.")?;
    report_write_error(writer, service, outcome.write_error)
}
