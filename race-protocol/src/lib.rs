use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: &str = "v1";

/// Dense layer of a feed-forward controller.
///
/// `weights[o][i]` is the weight from input `i` to output `o`; `biases` has one
/// entry per output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerGenome {
    pub weights: Vec<Vec<f64>>,
    pub biases: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genome {
    pub id: u64,
    pub layers: Vec<LayerGenome>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenomeFile {
    #[serde(default = "default_version")]
    pub version: String,
    pub genomes: Vec<Genome>,
}

impl GenomeFile {
    pub fn new(genomes: Vec<Genome>) -> Self {
        Self {
            version: default_version(),
            genomes,
        }
    }
}

fn default_version() -> String {
    PROTOCOL_VERSION.to_string()
}

/// Why a round stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundEnd {
    /// Every car crashed.
    AllCrashed,
    /// The stop signal was raised between ticks.
    Stopped,
    TickLimit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryReport {
    pub genome_id: u64,
    pub fitness: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundReport {
    pub round: u32,
    pub ticks: u64,
    pub end: RoundEnd,
    pub entries: Vec<EntryReport>,
}

impl RoundReport {
    pub fn best(&self) -> Option<&EntryReport> {
        self.entries
            .iter()
            .max_by(|a, b| a.fitness.total_cmp(&b.fitness))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genome_file_defaults_version_when_missing() {
        let file: GenomeFile =
            serde_json::from_str(r#"{ "genomes": [ { "id": 3, "layers": [] } ] }"#).unwrap();
        assert_eq!(file.version, PROTOCOL_VERSION);
        assert_eq!(file.genomes[0].id, 3);
    }

    #[test]
    fn round_end_uses_snake_case() {
        let text = serde_json::to_string(&RoundEnd::AllCrashed).unwrap();
        assert_eq!(text, "\"all_crashed\"");
    }

    #[test]
    fn best_entry_picks_highest_fitness() {
        let report = RoundReport {
            round: 0,
            ticks: 12,
            end: RoundEnd::AllCrashed,
            entries: vec![
                EntryReport { genome_id: 1, fitness: 4.0 },
                EntryReport { genome_id: 2, fitness: 12.0 },
                EntryReport { genome_id: 3, fitness: 7.0 },
            ],
        };
        assert_eq!(report.best().map(|e| e.genome_id), Some(2));
    }
}
