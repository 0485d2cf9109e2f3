use crate::core::models::atom::{Atom, AtomType};
use crate::core::models::typing::{BondingContext, assign_type, is_heteroatom};
use nalgebra::Point3;
use std::io::{self, BufRead};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum SdfError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: SdfParseErrorKind },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SdfParseErrorKind {
    #[error("Invalid integer format in columns {columns} (value: '{value}')")]
    InvalidInt { columns: String, value: String },
    #[error("Invalid float format in columns {columns} (value: '{value}')")]
    InvalidFloat { columns: String, value: String },
    #[error("Required field in columns {columns} is empty")]
    MissingRequiredField { columns: String },
    #[error("V3000 connection tables are not supported")]
    UnsupportedV3000,
    #[error("Molecule block ended before its atoms and bonds were complete")]
    TruncatedBlock,
    #[error("Bond references atom {index}, but the block declares {count} atoms")]
    BondOutOfRange { index: usize, count: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SdfAtom {
    pub element: String,
    pub position: Point3<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SdfBond {
    pub a: usize,
    pub b: usize,
    pub order: u8,
}

/// One MDL V2000 connection table, before typing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SdfRecord {
    pub title: String,
    pub atoms: Vec<SdfAtom>,
    pub bonds: Vec<SdfBond>,
}

const SDF_AROMATIC_BOND: u8 = 4;
const RECORD_TERMINATOR: &str = "$$$$";

fn slice_and_trim(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end.min(line.len())).unwrap_or("").trim()
}

fn parse_int(line: &str, start: usize, end: usize, line_num: usize) -> Result<usize, SdfError> {
    let value = slice_and_trim(line, start, end);
    value.parse().map_err(|_| SdfError::Parse {
        line: line_num,
        kind: SdfParseErrorKind::InvalidInt {
            columns: format!("{}-{}", start + 1, end),
            value: value.into(),
        },
    })
}

fn parse_float(line: &str, start: usize, end: usize, line_num: usize) -> Result<f32, SdfError> {
    let value = slice_and_trim(line, start, end);
    value.parse().map_err(|_| SdfError::Parse {
        line: line_num,
        kind: SdfParseErrorKind::InvalidFloat {
            columns: format!("{}-{}", start + 1, end),
            value: value.into(),
        },
    })
}

/// Streams connection tables out of a multi-molecule SD file.
pub struct SdfReader<R> {
    reader: R,
    line_num: usize,
    buf: String,
}

impl<R: BufRead> SdfReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_num: 0,
            buf: String::new(),
        }
    }

    fn next_line(&mut self) -> Result<Option<String>, SdfError> {
        self.buf.clear();
        if self.reader.read_line(&mut self.buf)? == 0 {
            return Ok(None);
        }
        self.line_num += 1;
        Ok(Some(self.buf.trim_end_matches(['\n', '\r']).to_string()))
    }

    fn require_line(&mut self) -> Result<String, SdfError> {
        self.next_line()?.ok_or(SdfError::Parse {
            line: self.line_num,
            kind: SdfParseErrorKind::TruncatedBlock,
        })
    }

    /// Reads the next record, or `None` once the input is exhausted.
    pub fn read_record(&mut self) -> Result<Option<SdfRecord>, SdfError> {
        // Header: title, program, comment, counts. Titles may be blank, so trailing
        // whitespace at the end of a file only counts as exhaustion once EOF is hit.
        let mut header: Vec<String> = Vec::with_capacity(4);
        while header.len() < 4 {
            match self.next_line()? {
                None if header.iter().all(|l| l.trim().is_empty()) => return Ok(None),
                None => {
                    return Err(SdfError::Parse {
                        line: self.line_num,
                        kind: SdfParseErrorKind::TruncatedBlock,
                    });
                }
                Some(line) if header.is_empty() && line.trim() == RECORD_TERMINATOR => continue,
                Some(line) => header.push(line),
            }
        }
        let counts = header.pop().unwrap_or_default();
        let counts_line = self.line_num;
        let title = header.swap_remove(0);
        if counts.contains("V3000") {
            return Err(SdfError::Parse {
                line: counts_line,
                kind: SdfParseErrorKind::UnsupportedV3000,
            });
        }
        let atom_count = parse_int(&counts, 0, 3, counts_line)?;
        let bond_count = parse_int(&counts, 3, 6, counts_line)?;

        let mut atoms = Vec::with_capacity(atom_count);
        for _ in 0..atom_count {
            let line = self.require_line()?;
            let ln = self.line_num;
            let x = parse_float(&line, 0, 10, ln)?;
            let y = parse_float(&line, 10, 20, ln)?;
            let z = parse_float(&line, 20, 30, ln)?;
            let element = slice_and_trim(&line, 31, 34);
            if element.is_empty() {
                return Err(SdfError::Parse {
                    line: ln,
                    kind: SdfParseErrorKind::MissingRequiredField {
                        columns: "32-34".into(),
                    },
                });
            }
            atoms.push(SdfAtom {
                element: element.to_string(),
                position: Point3::new(x, y, z),
            });
        }

        let mut bonds = Vec::with_capacity(bond_count);
        for _ in 0..bond_count {
            let line = self.require_line()?;
            let ln = self.line_num;
            let a = parse_int(&line, 0, 3, ln)?;
            let b = parse_int(&line, 3, 6, ln)?;
            let order = parse_int(&line, 6, 9, ln)?;
            for index in [a, b] {
                if index == 0 || index > atom_count {
                    return Err(SdfError::Parse {
                        line: ln,
                        kind: SdfParseErrorKind::BondOutOfRange {
                            index,
                            count: atom_count,
                        },
                    });
                }
            }
            bonds.push(SdfBond {
                a: a - 1,
                b: b - 1,
                order: order.min(u8::MAX as usize) as u8,
            });
        }

        while let Some(line) = self.next_line()? {
            if line.trim() == RECORD_TERMINATOR {
                break;
            }
        }

        Ok(Some(SdfRecord {
            title: title.trim().to_string(),
            atoms,
            bonds,
        }))
    }
}

impl SdfRecord {
    /// Types every atom and drops nonpolar hydrogens, which carry no density of their own.
    ///
    /// Atoms whose element has no entry in the type table are skipped with a warning.
    pub fn typed_atoms(&self) -> Vec<Atom> {
        let mut contexts = vec![BondingContext::default(); self.atoms.len()];
        for bond in &self.bonds {
            for (this, other) in [(bond.a, bond.b), (bond.b, bond.a)] {
                let other_element = &self.atoms[other].element;
                let ctx = &mut contexts[this];
                if other_element.eq_ignore_ascii_case("H") {
                    ctx.bonded_to_hydrogen = true;
                } else {
                    ctx.heavy_neighbors += 1;
                }
                if is_heteroatom(other_element) {
                    ctx.bonded_to_heteroatom = true;
                }
                if bond.order == SDF_AROMATIC_BOND {
                    ctx.aromatic = true;
                }
            }
        }

        self.atoms
            .iter()
            .zip(&contexts)
            .filter_map(|(atom, ctx)| match assign_type(&atom.element, ctx) {
                Some(AtomType::Hydrogen) => None,
                Some(ty) => Some(Atom::new(atom.position, ty)),
                None => {
                    warn!(
                        "Skipping atom with unsupported element '{}' in molecule '{}'.",
                        atom.element, self.title
                    );
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Cursor;

    pub(crate) const METHANOL: &str = "\
methanol
  griddream

  6  5  0  0  0  0  0  0  0  0999 V2000
    0.0000    0.0000    0.0000 C   0  0  0  0  0  0  0  0  0  0  0  0
    1.4000    0.0000    0.0000 O   0  0  0  0  0  0  0  0  0  0  0  0
    1.7000    0.9000    0.0000 H   0  0  0  0  0  0  0  0  0  0  0  0
   -0.4000    1.0000    0.0000 H   0  0  0  0  0  0  0  0  0  0  0  0
   -0.4000   -0.5000    0.9000 H   0  0  0  0  0  0  0  0  0  0  0  0
   -0.4000   -0.5000   -0.9000 H   0  0  0  0  0  0  0  0  0  0  0  0
  1  2  1  0
  2  3  1  0
  1  4  1  0
  1  5  1  0
  1  6  1  0
M  END
> <score>
1.0

$$$$
";

    pub(crate) fn single_atom_block(title: &str, element: &str, x: f32) -> String {
        format!(
            "{title}\n  griddream\n\n  1  0  0  0  0  0  0  0  0  0999 V2000\n{x:>10.4}{y:>10.4}{z:>10.4} {element:<3} 0  0  0  0  0  0  0  0  0  0  0  0\nM  END\n$$$$\n",
            y = 0.0f32,
            z = 0.0f32,
        )
    }

    #[test]
    fn reads_atoms_bonds_and_title() {
        let mut reader = SdfReader::new(Cursor::new(METHANOL));
        let record = reader.read_record().unwrap().unwrap();

        assert_eq!(record.title, "methanol");
        assert_eq!(record.atoms.len(), 6);
        assert_eq!(record.bonds.len(), 5);
        assert_eq!(record.atoms[1].element, "O");
        assert!((record.atoms[1].position.x - 1.4).abs() < 1e-6);
        assert_eq!(record.bonds[1], SdfBond { a: 1, b: 2, order: 1 });
        assert!(reader.read_record().unwrap().is_none());
    }

    #[test]
    fn typing_drops_nonpolar_hydrogens_and_keeps_polar_ones() {
        let mut reader = SdfReader::new(Cursor::new(METHANOL));
        let atoms = reader.read_record().unwrap().unwrap().typed_atoms();

        let types: Vec<_> = atoms.iter().map(|a| a.atom_type).collect();
        assert_eq!(
            types,
            vec![
                AtomType::AliphaticCarbonXSNonHydrophobe,
                AtomType::OxygenXSDonorAcceptor,
                AtomType::PolarHydrogen,
            ]
        );
    }

    #[test]
    fn streams_multiple_records_in_order() {
        let content = format!(
            "{}{}{}",
            single_atom_block("first", "C", 1.0),
            single_atom_block("second", "N", 2.0),
            single_atom_block("third", "O", 3.0)
        );
        let mut reader = SdfReader::new(Cursor::new(content));

        let titles: Vec<_> = std::iter::from_fn(|| reader.read_record().unwrap())
            .map(|r| r.title)
            .collect();
        assert_eq!(titles, vec!["first", "second", "third"]);
    }

    #[test]
    fn truncated_atom_block_is_a_parse_error() {
        let content = "broken\n  prog\n\n  3  0  0  0  0  0  0  0  0  0999 V2000\n    0.0000    0.0000    0.0000 C   0\n";
        let mut reader = SdfReader::new(Cursor::new(content));

        let err = reader.read_record().unwrap_err();
        assert!(matches!(
            err,
            SdfError::Parse {
                kind: SdfParseErrorKind::TruncatedBlock,
                ..
            }
        ));
    }

    #[test]
    fn invalid_coordinate_reports_line_and_columns() {
        let content = "bad\n  prog\n\n  1  0  0  0  0  0  0  0  0  0999 V2000\n    abcdef    0.0000    0.0000 C   0\nM  END\n$$$$\n";
        let mut reader = SdfReader::new(Cursor::new(content));

        match reader.read_record().unwrap_err() {
            SdfError::Parse { line, kind } => {
                assert_eq!(line, 5);
                assert_eq!(
                    kind,
                    SdfParseErrorKind::InvalidFloat {
                        columns: "1-10".into(),
                        value: "abcdef".into()
                    }
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn v3000_is_rejected() {
        let content = "v3\n  prog\n\n  0  0  0     0  0            999 V3000\n";
        let mut reader = SdfReader::new(Cursor::new(content));
        assert!(matches!(
            reader.read_record().unwrap_err(),
            SdfError::Parse {
                kind: SdfParseErrorKind::UnsupportedV3000,
                ..
            }
        ));
    }

    #[test]
    fn bond_outside_atom_range_is_rejected() {
        let content = "bond\n  prog\n\n  1  1  0  0  0  0  0  0  0  0999 V2000\n    0.0000    0.0000    0.0000 C   0\n  1  2  1  0\nM  END\n$$$$\n";
        let mut reader = SdfReader::new(Cursor::new(content));
        assert!(matches!(
            reader.read_record().unwrap_err(),
            SdfError::Parse {
                kind: SdfParseErrorKind::BondOutOfRange { index: 2, count: 1 },
                ..
            }
        ));
    }

    #[test]
    fn empty_input_is_exhausted_immediately() {
        let mut reader = SdfReader::new(Cursor::new(""));
        assert!(reader.read_record().unwrap().is_none());
    }
}
