use anyhow::{Context, Result};
use clap::Subcommand;
use polkahub::prelude::*;

#[derive(Debug, Clone, Subcommand)]
pub enum VaultCommand {
    /// Splits a hex payload into QR frames
    Frames {
        payload: String,
        /// Defaults to `vault_max_frame_size` from the config
        #[arg(long)]
        max_frame_size: Option<usize>,
    },
    /// Reassembles hex frames, in any order, into the payload
    Assemble {
        #[arg(required = true)]
        frames: Vec<String>,
    },
}

fn decode_hex(s: &str) -> Result<Vec<u8>> {
    hex::decode(s.trim_start_matches("0x")).with_context(|| format!("invalid hex {s}"))
}

impl VaultCommand {
    pub fn run(&self, config: &HubConfig, log: impl Fn(VaultLog)) -> Result<()> {
        match self {
            VaultCommand::Frames {
                payload,
                max_frame_size,
            } => {
                let payload = decode_hex(payload)?;
                let frames = create_frames(
                    &payload,
                    max_frame_size.unwrap_or(config.vault_max_frame_size),
                )?;
                log(VaultLog::Frames(frames.iter().map(hex::encode).collect()));
            }
            VaultCommand::Assemble { frames } => {
                let frames = frames
                    .iter()
                    .map(|f| decode_hex(f))
                    .collect::<Result<Vec<_>>>()?;
                let payload = assemble_frames(frames.iter().map(|f| f.as_slice()))?;
                log(VaultLog::Payload(hex::encode(payload)));
            }
        }
        Ok(())
    }
}

pub enum VaultLog {
    Frames(Vec<String>),
    Payload(String),
}
