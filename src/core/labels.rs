use rand::{distributions::Alphanumeric, rngs::StdRng, Rng, SeedableRng};
use sha2::{Digest, Sha256};

const ADJECTIVES: &[&str] = &[
    "amber", "brisk", "calm", "dapper", "eager", "fuzzy", "gentle", "hollow",
    "icy", "jolly", "keen", "lucid", "mellow", "nimble", "olive", "proud",
    "quiet", "rapid", "sunny", "tidy", "urban", "vivid", "witty", "young",
];

const NOUNS: &[&str] = &[
    "anchor", "badger", "comet", "delta", "ember", "falcon", "glacier", "harbor",
    "island", "juniper", "kestrel", "lantern", "meadow", "nebula", "orchid", "pebble",
    "quartz", "river", "spruce", "tundra", "umber", "valley", "willow", "zephyr",
];

const SUFFIX_LEN: usize = 6;

/// Produces collision-resistant, human-readable labels.
pub trait LabelGenerator: Send + Sync {
    /// The same seed always yields the same label; without a seed the label is random.
    fn generate(&self, seed: Option<&[u8]>) -> String;
}

/// `<adjective>-<noun>-<suffix>` labels, e.g. `brisk-falcon-x7k2qa`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordLabelGenerator;

impl LabelGenerator for WordLabelGenerator {
    fn generate(&self, seed: Option<&[u8]>) -> String {
        match seed {
            Some(seed) => {
                let digest = Sha256::digest(seed);
                let mut bytes = [0u8; 32];
                bytes.copy_from_slice(&digest);
                compose(&mut StdRng::from_seed(bytes))
            }
            None => compose(&mut rand::thread_rng()),
        }
    }
}

fn compose<R: Rng>(rng: &mut R) -> String {
    let adjective = ADJECTIVES[rng.gen_range(0..ADJECTIVES.len())];
    let noun = NOUNS[rng.gen_range(0..NOUNS.len())];
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| char::from(rng.sample(Alphanumeric)).to_ascii_lowercase())
        .collect();

    format!("{}-{}-{}", adjective, noun, suffix)
}
