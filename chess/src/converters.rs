//! Conversions between square labels and cozy-chess values.

use cozy_chess::{File, Rank, Square};

pub fn parse_file(c: char) -> Option<File> {
    match c {
        'a'..='h' => Some(File::index(c as usize - 'a' as usize)),
        _ => None,
    }
}

pub fn parse_rank(c: char) -> Option<Rank> {
    match c {
        '1'..='8' => Some(Rank::index(c as usize - '1' as usize)),
        _ => None,
    }
}

/// Parse a square label such as `"e4"`. Case-insensitive on the file.
pub fn parse_square(s: &str) -> Option<Square> {
    let mut chars = s.trim().chars();
    let file = parse_file(chars.next()?.to_ascii_lowercase())?;
    let rank = parse_rank(chars.next()?)?;
    if chars.next().is_some() {
        return None;
    }
    Some(Square::new(file, rank))
}

pub fn format_square(sq: Square) -> String {
    let file = (b'a' + sq.file() as u8) as char;
    let rank = (b'1' + sq.rank() as u8) as char;
    format!("{}{}", file, rank)
}
