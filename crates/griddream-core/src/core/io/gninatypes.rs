//! The `gninatypes` binary atom dump: a headerless run of fixed-size records, each
//! holding three little-endian `f32` coordinates followed by an `i32` type code.

use crate::core::models::atom::{Atom, AtomType, InvalidTypeCode};
use nalgebra::Point3;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use thiserror::Error;

pub const RECORD_SIZE: usize = 16;
pub const FILE_EXTENSION: &str = "gninatypes";

#[derive(Debug, Error)]
pub enum GninaTypesError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Truncated record {record}: expected {RECORD_SIZE} bytes, found {found}")]
    TruncatedRecord { record: usize, found: usize },
    #[error("Invalid atom type in record {record}: {source}")]
    InvalidType {
        record: usize,
        #[source]
        source: InvalidTypeCode,
    },
}

/// Returns true when the path names a `gninatypes` dump.
pub fn is_gninatypes_path(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(FILE_EXTENSION))
}

/// Reads every record until EOF. A partial trailing record is an error, never dropped.
pub fn read_from(reader: &mut impl Read) -> Result<Vec<Atom>, GninaTypesError> {
    let mut atoms = Vec::new();
    let mut record = [0u8; RECORD_SIZE];

    loop {
        let filled = fill_record(reader, &mut record)?;
        if filled == 0 {
            break;
        }
        if filled < RECORD_SIZE {
            return Err(GninaTypesError::TruncatedRecord {
                record: atoms.len(),
                found: filled,
            });
        }
        let x = f32::from_le_bytes([record[0], record[1], record[2], record[3]]);
        let y = f32::from_le_bytes([record[4], record[5], record[6], record[7]]);
        let z = f32::from_le_bytes([record[8], record[9], record[10], record[11]]);
        let code = i32::from_le_bytes([record[12], record[13], record[14], record[15]]);
        let atom_type =
            AtomType::from_code(code).map_err(|source| GninaTypesError::InvalidType {
                record: atoms.len(),
                source,
            })?;
        atoms.push(Atom::new(Point3::new(x, y, z), atom_type));
    }

    Ok(atoms)
}

pub fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Atom>, GninaTypesError> {
    let mut reader = BufReader::new(File::open(path)?);
    read_from(&mut reader)
}

pub fn write_to(atoms: &[Atom], writer: &mut impl Write) -> Result<(), GninaTypesError> {
    for atom in atoms {
        writer.write_all(&atom.position.x.to_le_bytes())?;
        writer.write_all(&atom.position.y.to_le_bytes())?;
        writer.write_all(&atom.position.z.to_le_bytes())?;
        writer.write_all(&atom.atom_type.code().to_le_bytes())?;
    }
    Ok(())
}

pub fn write_to_path<P: AsRef<Path>>(atoms: &[Atom], path: P) -> Result<(), GninaTypesError> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_to(atoms, &mut writer)?;
    writer.flush()?;
    Ok(())
}

fn fill_record(reader: &mut impl Read, record: &mut [u8; RECORD_SIZE]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < RECORD_SIZE {
        match reader.read(&mut record[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn raw_record(x: f32, y: f32, z: f32, code: i32) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(RECORD_SIZE);
        bytes.extend_from_slice(&x.to_le_bytes());
        bytes.extend_from_slice(&y.to_le_bytes());
        bytes.extend_from_slice(&z.to_le_bytes());
        bytes.extend_from_slice(&code.to_le_bytes());
        bytes
    }

    #[test]
    fn reads_exactly_n_well_formed_records() {
        let mut bytes = raw_record(1.0, 2.0, 3.0, 2);
        bytes.extend(raw_record(-4.5, 0.25, 8.0, 13));
        bytes.extend(raw_record(0.0, 0.0, -1.0, 17));

        let atoms = read_from(&mut Cursor::new(bytes)).unwrap();

        assert_eq!(atoms.len(), 3);
        assert_eq!(atoms[0].position, Point3::new(1.0, 2.0, 3.0));
        assert_eq!(atoms[0].atom_type, AtomType::AliphaticCarbonXSHydrophobe);
        assert_eq!(atoms[1].position, Point3::new(-4.5, 0.25, 8.0));
        assert_eq!(atoms[1].atom_type, AtomType::OxygenXSAcceptor);
        assert_eq!(atoms[2].atom_type, AtomType::Fluorine);
    }

    #[test]
    fn truncated_final_record_is_an_error() {
        let mut bytes = raw_record(1.0, 2.0, 3.0, 2);
        bytes.extend_from_slice(&raw_record(4.0, 5.0, 6.0, 6)[..10]);

        let err = read_from(&mut Cursor::new(bytes)).unwrap_err();
        assert!(matches!(
            err,
            GninaTypesError::TruncatedRecord {
                record: 1,
                found: 10
            }
        ));
    }

    #[test]
    fn empty_dump_has_no_atoms() {
        assert!(read_from(&mut Cursor::new(Vec::new())).unwrap().is_empty());
    }

    #[test]
    fn unknown_type_code_is_rejected() {
        let bytes = raw_record(0.0, 0.0, 0.0, 99);
        assert!(matches!(
            read_from(&mut Cursor::new(bytes)).unwrap_err(),
            GninaTypesError::InvalidType { record: 0, .. }
        ));
    }

    #[test]
    fn written_dump_is_byte_exact() {
        let atoms = vec![Atom::new(Point3::new(1.5, -2.0, 0.5), AtomType::Sulfur)];
        let mut out = Vec::new();
        write_to(&atoms, &mut out).unwrap();

        assert_eq!(out, raw_record(1.5, -2.0, 0.5, 14));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_from_path(dir.path().join("absent.gninatypes"));
        assert!(matches!(result, Err(GninaTypesError::Io(_))));
    }

    #[test]
    fn extension_detection_is_case_insensitive() {
        assert!(is_gninatypes_path(Path::new("ref/lig.gninatypes")));
        assert!(is_gninatypes_path(Path::new("LIG.GNINATYPES")));
        assert!(!is_gninatypes_path(Path::new("lig.sdf")));
        assert!(!is_gninatypes_path(Path::new("none")));
    }
}
