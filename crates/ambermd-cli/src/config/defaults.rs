pub struct DefaultsConfig {
    pub temperature: f64,
    pub production_ns: u64,
    pub ligand_charge: i32,
    pub ligand_multiplicity: u32,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            temperature: 303.15,
            production_ns: 100,
            ligand_charge: 0,
            ligand_multiplicity: 1,
        }
    }
}
