use std::fmt::Write as _;

use anyhow::{anyhow, bail};
use client_core::{
    AddressEditor, AddressError, ChannelControl, CommitOutcome, SessionController,
    SessionOutcome, SessionView, SkipReason,
};
use shared::domain::{ChannelIntensity, ChannelName, ConnectionState, PowerState};

const BAR_WIDTH: usize = 20;

pub const HELP: &str = "\
commands:
  status                 redraw the panel
  toggle                 switch the device on or off
  retry                  read the device status again
  address <a.b.c.d>      connect to another device
  set <channel> <0-255>  write one channel (red, green, blue, cold, warm)
  help                   show this help
  quit                   leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Status,
    Toggle,
    Retry,
    Address(String),
    Set(ChannelName, ChannelIntensity),
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> anyhow::Result<Command> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(Command::Status);
    };
    let rest: Vec<&str> = words.collect();

    let command = match (head.to_ascii_lowercase().as_str(), rest.as_slice()) {
        ("status" | "s", []) => Command::Status,
        ("toggle" | "t" | "power", []) => Command::Toggle,
        ("retry" | "r", []) => Command::Retry,
        ("address" | "addr" | "ip", [address]) => Command::Address((*address).to_string()),
        ("set", [channel, value]) => {
            let channel: ChannelName = channel.parse()?;
            let raw: i64 = value
                .parse()
                .map_err(|_| anyhow!("'{value}' is not a number"))?;
            Command::Set(channel, ChannelIntensity::try_from(raw)?)
        }
        ("help" | "h" | "?", []) => Command::Help,
        ("quit" | "q" | "exit", []) => Command::Quit,
        (other, _) => bail!("unrecognised command '{other}'; type `help`"),
    };
    Ok(command)
}

pub struct Panel {
    session: SessionController,
    editor: AddressEditor,
    controls: Vec<ChannelControl>,
}

impl Panel {
    pub async fn new(session: SessionController) -> Self {
        let view = session.view().await;
        let controls = ChannelName::ALL
            .iter()
            .map(|name| ChannelControl::new(*name, view.snapshot.channel(*name)))
            .collect();
        Self {
            editor: AddressEditor::new(view.address),
            session,
            controls,
        }
    }

    pub async fn start(&mut self) -> SessionOutcome {
        let outcome = self.session.start().await;
        self.sync().await;
        outcome
    }

    /// Runs one command and returns a one line report, if there is anything
    /// to say beyond the redrawn panel.
    pub async fn handle(&mut self, command: Command) -> Option<String> {
        let note = match command {
            Command::Status | Command::Help | Command::Quit => None,
            Command::Toggle => describe_outcome("toggle", self.session.toggle().await),
            Command::Retry => describe_outcome("retry", self.session.retry().await),
            Command::Address(draft) => self.change_address(draft).await,
            Command::Set(channel, value) => self.set_channel(channel, value).await,
        };
        self.sync().await;
        note
    }

    pub async fn render(&self) -> String {
        render(&self.session.view().await, &self.controls)
    }

    async fn change_address(&mut self, draft: String) -> Option<String> {
        self.editor.begin_edit();
        if let Err(err) = self.editor.set_draft(draft) {
            return Some(err.to_string());
        }
        let submitted = match self.editor.submit() {
            Ok(submitted) => submitted,
            Err(err @ AddressError::Invalid(_)) => {
                self.editor.cancel();
                return Some(err.to_string());
            }
            Err(err) => return Some(err.to_string()),
        };
        match submitted {
            Some(address) => describe_outcome("address", self.session.commit_address(address).await),
            None => Some("already using that address".to_string()),
        }
    }

    async fn set_channel(&mut self, channel: ChannelName, value: ChannelIntensity) -> Option<String> {
        let Some(control) = self.controls.iter_mut().find(|c| c.channel() == channel) else {
            return Some(format!("no control for {channel}"));
        };
        if let Err(err) = control.input(value) {
            return Some(err.to_string());
        }
        match self.session.commit_channel(control).await {
            CommitOutcome::Committed(_) => None,
            CommitOutcome::Unchanged => Some(format!("{} already at {value}", channel.label())),
            CommitOutcome::Reverted { to, reason } => {
                Some(format!("{} reverted to {to}: {reason}", channel.label()))
            }
            CommitOutcome::Busy => Some(format!("{} is still writing", channel.label())),
        }
    }

    async fn sync(&mut self) {
        let view = self.session.view().await;
        self.editor.sync(&view.address);
        for control in &mut self.controls {
            control.sync_committed(view.snapshot.channel(control.channel()));
        }
    }
}

fn describe_outcome(action: &str, outcome: SessionOutcome) -> Option<String> {
    match outcome {
        SessionOutcome::Applied | SessionOutcome::Failed(_) => None,
        SessionOutcome::Skipped(SkipReason::NotConnected) => {
            Some(format!("{action} ignored: device is not connected"))
        }
        SessionOutcome::Skipped(SkipReason::Busy) => {
            Some(format!("{action} ignored: another request is in flight"))
        }
        SessionOutcome::Skipped(SkipReason::Unchanged) => {
            Some("already using that address".to_string())
        }
    }
}

pub fn render(view: &SessionView, controls: &[ChannelControl]) -> String {
    let mut out = String::new();

    let (indicator, action) = match (view.busy, view.snapshot.power) {
        (true, _) => ("...", "busy"),
        (false, PowerState::On) => ("ON", "Turn Off"),
        (false, PowerState::Off) => ("OFF", "Turn On"),
    };
    let _ = writeln!(out, "RSHN [{indicator}] CTRL    toggle: {action}");
    let _ = writeln!(out, "device {} ({})", view.address, view.connection);
    if view.connection == ConnectionState::Connecting {
        let _ = writeln!(out, "Connecting to device...");
    }

    for control in controls {
        let filled = ((control.percent() / 100.0 * BAR_WIDTH as f32) as usize).min(BAR_WIDTH);
        let _ = write!(
            out,
            "{:<11}{:>4} |{}{}|",
            control.channel().label(),
            control.displayed(),
            "#".repeat(filled),
            "-".repeat(BAR_WIDTH - filled),
        );
        if !control.is_interactive() {
            let _ = write!(out, " (saving)");
        }
        if let Some(error) = control.error() {
            let _ = write!(out, "  ! {error}");
        }
        out.push('\n');
    }

    if let Some(error) = &view.error {
        let _ = writeln!(out, "error: {error}");
        if view.offers_retry() {
            let _ = writeln!(out, "type `retry` to reconnect");
        }
    }
    out
}
