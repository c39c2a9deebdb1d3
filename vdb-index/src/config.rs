//! Construction parameters for the IVF and SimHash-LSH index variants.
//!
//! Flat has none — it's stores-everything-and-scans, so there is nothing to
//! tune beyond the dimension.

#[derive(Debug, Clone)]
pub struct IvfConfig {
    pub n_clusters: usize,
    pub n_probes: usize,
    pub train_iters: usize,
    pub rng_seed: u64,
}

impl Default for IvfConfig {
    fn default() -> Self {
        Self { n_clusters: 64, n_probes: 1, train_iters: 20, rng_seed: 42 }
    }
}

impl IvfConfig {
    /// Clamp to the invariants the spec requires (`n_clusters >= 1`,
    /// `n_probes >= 1`); everything else is accepted as given.
    pub fn normalized(mut self) -> Self {
        self.n_clusters = self.n_clusters.max(1);
        self.n_probes = self.n_probes.max(1);
        self
    }
}

#[derive(Debug, Clone)]
pub struct LshConfig {
    pub n_bits: u32,
    pub n_tables: usize,
    pub rng_seed: u64,
}

impl Default for LshConfig {
    fn default() -> Self {
        Self { n_bits: 16, n_tables: 8, rng_seed: 42 }
    }
}

impl LshConfig {
    /// Clamp to the invariants the spec requires (`1 <= n_bits <= 64`,
    /// `n_tables >= 1` — a u64 bucket key can't hold more than 64 bits).
    pub fn normalized(mut self) -> Self {
        self.n_bits = self.n_bits.clamp(1, 64);
        self.n_tables = self.n_tables.max(1);
        self
    }
}
