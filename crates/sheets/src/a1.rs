//! A1 notation helpers.

/// Column letters for a 1-based column index: 1 → `A`, 26 → `Z`, 27 → `AA`.
#[must_use]
pub fn column_letters(mut column: usize) -> String {
	let mut letters = Vec::new();
	while column > 0 {
		let rem = (column - 1) % 26;
		// rem < 26
		#[allow(clippy::cast_possible_truncation)]
		letters.push(char::from(b'A' + rem as u8));
		column = (column - 1) / 26;
	}
	letters.iter().rev().collect()
}

/// Sheet name as it must appear before `!`, quoted and with inner quotes doubled.
#[must_use]
pub fn quote_sheet(sheet: &str) -> String {
	format!("'{}'", sheet.replace('\'', "''"))
}

/// The whole sheet.
#[must_use]
pub fn sheet_range(sheet: &str) -> String {
	quote_sheet(sheet)
}

/// Columns `A` through the `width`-th of a single row.
#[must_use]
pub fn row_range(sheet: &str, row: u32, width: usize) -> String {
	format!(
		"{}!A{row}:{}{row}",
		quote_sheet(sheet),
		column_letters(width.max(1))
	)
}

/// Top-left cell, used as the anchor for appends.
#[must_use]
pub fn anchor_range(sheet: &str) -> String {
	format!("{}!A1", quote_sheet(sheet))
}
