//! Binary save/load of a single trained genome.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::{EvoError, Result};
use crate::game::Agent;
use crate::nn::NeuralNet;

const MAGIC: &[u8; 4] = b"SNKG";

/// A network plus the seed that drives its food placement, which together
/// replay a game exactly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenomeRecord {
    pub seed: u64,
    pub network: NeuralNet,
}

impl GenomeRecord {
    pub fn from_agent(agent: &Agent) -> Self {
        Self { seed: agent.seed(), network: agent.brain().clone() }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(MAGIC)?;
        let encoded = bincode::serde::encode_to_vec(self, bincode::config::standard())?;
        writer.write_all(&encoded)?;
        writer.flush()?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut buffer = Vec::new();
        BufReader::new(File::open(path)?).read_to_end(&mut buffer)?;
        if buffer.len() < MAGIC.len() || &buffer[..MAGIC.len()] != MAGIC {
            return Err(EvoError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "not a genome file",
            )));
        }
        let (record, _): (GenomeRecord, usize) =
            bincode::serde::decode_from_slice(&buffer[MAGIC.len()..], bincode::config::standard())?;
        record.network.validate()?;
        Ok(record)
    }
}
