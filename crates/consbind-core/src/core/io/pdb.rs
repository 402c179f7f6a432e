use crate::core::io::traits::MolecularFile;
use crate::core::models::atom::Atom;
use crate::core::models::builder::{AtomRecord, StructureBuilder};
use crate::core::models::residue::Residue;
use crate::core::models::structure::Structure;
use nalgebra::Point3;
use std::io::{self, BufRead, Write};
use thiserror::Error;

/// Records that precede the coordinate section and are carried through to output files.
const HEADER_RECORDS: &[&str] = &[
    "HEADER", "TITLE", "COMPND", "SOURCE", "KEYWDS", "EXPDTA", "AUTHOR", "REMARK", "CRYST1",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdbMetadata {
    pub header_lines: Vec<String>,
    /// Number of MODEL records seen; only the first model is loaded.
    pub model_count: usize,
    /// Atom records dropped because they belonged to a non-primary alternate location.
    pub skipped_alt_locs: usize,
}

#[derive(Debug, Error)]
pub enum PdbError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse {
        line: usize,
        kind: PdbParseErrorKind,
    },
    #[error("Missing required record: {0}")]
    MissingRecord(String),
}

#[derive(Debug, Error)]
pub enum PdbParseErrorKind {
    #[error("Invalid integer format in columns {columns} (value: '{value}')")]
    InvalidInt { columns: String, value: String },
    #[error("Invalid float format in columns {columns} (value: '{value}')")]
    InvalidFloat { columns: String, value: String },
    #[error("Required field in columns {columns} is empty")]
    MissingRequiredField { columns: String },
    #[error("Line is too short for ATOM/HETATM record (must reach column 54)")]
    LineTooShort,
}

fn slice_and_trim(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end.min(line.len())).unwrap_or("").trim()
}

fn column_char(line: &str, index: usize) -> char {
    line.get(index..index + 1)
        .and_then(|s| s.chars().next())
        .unwrap_or(' ')
}

fn parse_float(line: &str, start: usize, end: usize, line_num: usize) -> Result<f64, PdbError> {
    let value = slice_and_trim(line, start, end);
    value.parse().map_err(|_| PdbError::Parse {
        line: line_num,
        kind: PdbParseErrorKind::InvalidFloat {
            columns: format!("{}-{}", start + 1, end),
            value: value.into(),
        },
    })
}

fn parse_optional_float(line: &str, start: usize, end: usize, default: f64) -> f64 {
    slice_and_trim(line, start, end).parse().unwrap_or(default)
}

pub struct PdbFile;

impl MolecularFile for PdbFile {
    type Metadata = PdbMetadata;
    type Error = PdbError;

    fn read_from(
        reader: &mut impl BufRead,
        name: &str,
    ) -> Result<(Structure, Self::Metadata), Self::Error> {
        let mut builder = StructureBuilder::new(name);
        let mut metadata = PdbMetadata::default();

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_num = line_num + 1;
            let record_type = slice_and_trim(&line, 0, 6);

            match record_type {
                "ATOM" | "HETATM" => {
                    if line.len() < 54 {
                        return Err(PdbError::Parse {
                            line: line_num,
                            kind: PdbParseErrorKind::LineTooShort,
                        });
                    }

                    let alt_loc = column_char(&line, 16);
                    if alt_loc != ' ' && alt_loc != 'A' {
                        metadata.skipped_alt_locs += 1;
                        continue;
                    }

                    let serial_str = slice_and_trim(&line, 6, 11);
                    let name_str = slice_and_trim(&line, 12, 16);
                    let res_name_str = slice_and_trim(&line, 17, 20);
                    let chain_id = column_char(&line, 21);
                    let res_seq_str = slice_and_trim(&line, 22, 26);
                    let insertion_code = column_char(&line, 26);

                    if name_str.is_empty() {
                        return Err(PdbError::Parse {
                            line: line_num,
                            kind: PdbParseErrorKind::MissingRequiredField {
                                columns: "13-16".into(),
                            },
                        });
                    }
                    // Serial numbers overflow into hexadecimal or '*****' in very large
                    // entries; they are informational only.
                    let serial: usize = serial_str.parse().unwrap_or(0);
                    let residue_number: isize =
                        res_seq_str.parse().map_err(|_| PdbError::Parse {
                            line: line_num,
                            kind: PdbParseErrorKind::InvalidInt {
                                columns: "23-26".into(),
                                value: res_seq_str.into(),
                            },
                        })?;
                    let x = parse_float(&line, 30, 38, line_num)?;
                    let y = parse_float(&line, 38, 46, line_num)?;
                    let z = parse_float(&line, 46, 54, line_num)?;
                    let occupancy = parse_optional_float(&line, 54, 60, 1.0);
                    let b_factor = parse_optional_float(&line, 60, 66, 0.0);
                    let element = slice_and_trim(&line, 76, 78);

                    builder.add_atom(AtomRecord {
                        serial,
                        name: name_str,
                        element: (!element.is_empty()).then_some(element),
                        residue_name: res_name_str,
                        chain_id,
                        residue_number,
                        insertion_code,
                        position: Point3::new(x, y, z),
                        occupancy,
                        b_factor,
                        is_hetero: record_type == "HETATM",
                    });
                }
                "MODEL" => {
                    metadata.model_count += 1;
                }
                "ENDMDL" => break,
                "END" => break,
                other if builder.atom_count() == 0 && HEADER_RECORDS.contains(&other) => {
                    metadata.header_lines.push(line.clone());
                }
                _ => {}
            }
        }

        if builder.atom_count() == 0 {
            return Err(PdbError::MissingRecord("ATOM/HETATM records".into()));
        }
        Ok((builder.build(), metadata))
    }

    fn write_to(
        structure: &Structure,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        for line in &metadata.header_lines {
            writeln!(writer, "{}", line)?;
        }
        write_atom_records(structure, writer)?;
        writeln!(writer, "END")?;
        Ok(())
    }
}

fn format_atom_name(atom: &Atom) -> String {
    if atom.name.len() < 4 && atom.element.len() == 1 {
        format!(" {:<3}", atom.name)
    } else {
        format!("{:<4}", atom.name)
    }
}

/// Writes the ATOM/HETATM records of a structure in chain order, closing each chain with
/// a TER record.
pub fn write_atom_records(structure: &Structure, writer: &mut impl Write) -> io::Result<()> {
    let mut fallback_serial = 0usize;
    for (_, chain) in structure.chains_iter() {
        let mut wrote_any = false;
        let residues = chain
            .residues()
            .iter()
            .filter_map(|&id| structure.residue(id));
        for residue in residues {
            for atom in residue.atoms().iter().filter_map(|&id| structure.atom(id)) {
                fallback_serial += 1;
                let serial = if atom.serial > 0 {
                    atom.serial
                } else {
                    fallback_serial
                };
                writeln!(
                    writer,
                    "{}",
                    format_atom_line(atom, residue, chain.id, serial)
                )?;
                wrote_any = true;
            }
        }
        if wrote_any {
            writeln!(writer, "TER")?;
        }
    }
    Ok(())
}

fn format_atom_line(atom: &Atom, residue: &Residue, chain_id: char, serial: usize) -> String {
    let record_type = if atom.is_hetero { "HETATM" } else { "ATOM" };
    format!(
        "{:<6}{:>5} {} {:>3} {}{:>4}{}   {:>8.3}{:>8.3}{:>8.3}{:>6.2}{:>6.2}          {:>2}",
        record_type,
        serial % 100_000,
        format_atom_name(atom),
        residue.name,
        chain_id,
        residue.number,
        residue.insertion_code,
        atom.position.x,
        atom.position.y,
        atom.position.z,
        atom.occupancy,
        atom.b_factor,
        atom.element
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SAMPLE: &str = "\
HEADER    HYDROLASE                               01-JAN-00   1ABC
REMARK   2 RESOLUTION.    1.80 ANGSTROMS.
ATOM      1  N   ALA A   1      11.104   6.134  -6.504  1.00 20.00           N
ATOM      2  CA  ALA A   1      11.639   6.071  -5.147  1.00 21.50           C
ATOM      3  CB AALA A   1      12.000   7.000  -4.000  0.60 22.00           C
ATOM      4  CB BALA A   1      12.100   7.100  -4.100  0.40 22.00           C
ATOM      5  CA  GLY A   2      13.000   5.000  -3.000  1.00 18.00
HETATM    6 ZN    ZN A 301       9.000   4.000  -2.000  1.00 30.00          ZN
HETATM    7  O   HOH A 401       8.000   3.000  -1.000  1.00 35.00           O
END
";

    fn parse(text: &str) -> Result<(Structure, PdbMetadata), PdbError> {
        PdbFile::read_from(&mut Cursor::new(text), "1abc")
    }

    #[test]
    fn reads_atoms_residues_and_hetero_flags() {
        let (structure, metadata) = parse(SAMPLE).unwrap();
        assert_eq!(structure.name(), "1abc");
        assert_eq!(structure.atom_count(), 6);
        assert_eq!(metadata.header_lines.len(), 2);
        assert_eq!(metadata.skipped_alt_locs, 1);

        let chain = structure.find_chain_by_id('A').unwrap();
        assert_eq!(structure.chain(chain).unwrap().residues().len(), 4);

        let hetero: Vec<_> = structure
            .hetero_atoms()
            .map(|(_, a)| a.name.clone())
            .collect();
        assert_eq!(hetero, vec!["ZN".to_string()]);

        let (_, first) = structure.atoms_iter().next().unwrap();
        assert_eq!(first.serial, 1);
        assert_eq!(first.b_factor, 20.0);
        assert!((first.position.x - 11.104).abs() < 1e-9);
    }

    #[test]
    fn infers_element_when_column_is_blank() {
        let (structure, _) = parse(SAMPLE).unwrap();
        let gly_ca = structure
            .atoms_iter()
            .map(|(_, atom)| atom)
            .find(|atom| atom.serial == 5)
            .unwrap();
        assert_eq!(gly_ca.element, "C");
    }

    #[test]
    fn stops_after_first_model() {
        let text = "\
MODEL        1
ATOM      1  CA  ALA A   1       0.000   0.000   0.000  1.00  0.00           C
ENDMDL
MODEL        2
ATOM      1  CA  ALA A   1       5.000   5.000   5.000  1.00  0.00           C
ENDMDL
";
        let (structure, metadata) = parse(text).unwrap();
        assert_eq!(structure.atom_count(), 1);
        assert_eq!(metadata.model_count, 1);
    }

    #[test]
    fn rejects_invalid_coordinates_with_line_number() {
        let text =
            "ATOM      1  CA  ALA A   1      abcdefg   0.000   0.000  1.00  0.00           C\n";
        match parse(text) {
            Err(PdbError::Parse {
                line: 1,
                kind: PdbParseErrorKind::InvalidFloat { .. },
            }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn rejects_short_atom_lines() {
        let text = "ATOM      1  CA  ALA A   1       0.000\n";
        assert!(matches!(
            parse(text),
            Err(PdbError::Parse {
                kind: PdbParseErrorKind::LineTooShort,
                ..
            })
        ));
    }

    #[test]
    fn rejects_files_without_atoms() {
        assert!(matches!(
            parse("HEADER    EMPTY\nEND\n"),
            Err(PdbError::MissingRecord(_))
        ));
    }

    #[test]
    fn written_records_can_be_read_back() {
        let (structure, metadata) = parse(SAMPLE).unwrap();
        let mut buffer = Vec::new();
        PdbFile::write_to(&structure, &metadata, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.starts_with("HEADER"));
        assert!(text.contains("HETATM    6 ZN    ZN A 301"));
        assert!(text.contains(
            "ATOM      2  CA  ALA A   1      11.639   6.071  -5.147  1.00 21.50           C"
        ));

        let (reread, _) = parse(&text).unwrap();
        assert_eq!(reread.atom_count(), structure.atom_count());
        assert_eq!(reread.hetero_atoms().count(), 1);
    }
}
