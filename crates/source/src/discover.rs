/// Words that say nothing about which company a report belongs to.
const STOPWORDS: [&str; 9] = [
	"grupo",
	"da",
	"de",
	"do",
	"e",
	"s.a.",
	"ltda",
	"exames",
	"ocupacionais",
];

const MIN_WORD_LEN: usize = 3;

/// Lowercased words of a sheet name worth looking for in a file name. Falls back to
/// the first word when nothing significant is left.
#[must_use]
pub fn significant_words(sheet: &str) -> Vec<String> {
	let cleaned = sheet.to_lowercase().replace(['.', '-', '_'], " ");

	let words = cleaned
		.split_whitespace()
		.filter(|word| word.chars().count() >= MIN_WORD_LEN && !STOPWORDS.contains(word))
		.map(ToString::to_string)
		.collect::<Vec<_>>();

	if words.is_empty() {
		sheet
			.split_whitespace()
			.next()
			.map(|word| vec![word.to_lowercase()])
			.unwrap_or_default()
	} else {
		words
	}
}

/// Picks the file for a dataset out of `names`.
///
/// A name containing the dataset key wins. Otherwise the first name containing every
/// significant word of the sheet name is taken. Matching ignores case.
#[must_use]
pub fn find_file<'n>(names: &'n [String], key: &str, sheet: &str) -> Option<&'n str> {
	let key = key.to_lowercase();
	let lowered = names.iter().map(|name| name.to_lowercase()).collect::<Vec<_>>();

	if !key.is_empty() {
		if let Some(idx) = lowered.iter().position(|name| name.contains(&key)) {
			return Some(names[idx].as_str());
		}
	}

	let words = significant_words(sheet);
	if words.is_empty() {
		return None;
	}

	lowered
		.iter()
		.position(|name| words.iter().all(|word| name.contains(word.as_str())))
		.map(|idx| names[idx].as_str())
}
