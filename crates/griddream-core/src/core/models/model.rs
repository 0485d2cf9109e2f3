use super::atom::Atom;

/// An in-memory molecular model as produced by a molecule source.
///
/// Movable atoms hold the ligand (starting at `ligand_begin`) and anything else the
/// source treats as flexible; fixed atoms hold the receptor, which during screening is
/// the reference ligand used for grid centering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Model {
    pub title: String,
    movable_atoms: Vec<Atom>,
    ligand_begin: usize,
    fixed_atoms: Vec<Atom>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the movable block with a single ligand spanning all of it.
    pub fn set_ligand(&mut self, title: &str, atoms: Vec<Atom>) {
        self.title = title.to_string();
        self.movable_atoms = atoms;
        self.ligand_begin = 0;
    }

    /// Replaces the movable block with leading flexible atoms followed by the ligand.
    ///
    /// The ligand start is set to the flexible atom count, so [`Model::ligand_atoms`]
    /// skips them while [`Model::num_movable_atoms`] still includes them.
    pub fn set_movable(&mut self, title: &str, flexible: Vec<Atom>, ligand: Vec<Atom>) {
        self.title = title.to_string();
        self.ligand_begin = flexible.len();
        self.movable_atoms = flexible;
        self.movable_atoms.extend(ligand);
    }

    pub fn set_fixed_atoms(&mut self, atoms: Vec<Atom>) {
        self.fixed_atoms = atoms;
    }

    pub fn num_movable_atoms(&self) -> usize {
        self.movable_atoms.len()
    }

    pub fn movable_atoms(&self) -> &[Atom] {
        &self.movable_atoms
    }

    /// The ligand's atoms: from the ligand start to the end of the movable block.
    pub fn ligand_atoms(&self) -> &[Atom] {
        &self.movable_atoms[self.ligand_begin.min(self.movable_atoms.len())..]
    }

    pub fn fixed_atoms(&self) -> &[Atom] {
        &self.fixed_atoms
    }
}
