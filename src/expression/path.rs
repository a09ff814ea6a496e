//! Document paths: dotted attribute names, each optionally followed by list indexes,
//! e.g. `comments[0].author`.

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Step<'a> {
    Attribute(&'a str),
    Index(usize),
}

/// Split a path segment into its attribute name and any trailing `[n]` indexes
pub(crate) fn split_segment(segment: &str) -> (&str, &str) {
    segment
        .find('[')
        .map_or((segment, ""), |start| segment.split_at(start))
}

/// The steps of `path`, always starting with an attribute. `None` when the path is malformed.
pub(crate) fn steps(path: &str) -> Option<Vec<Step<'_>>> {
    let mut steps = Vec::new();

    for segment in path.split('.') {
        let (name, mut indexes) = split_segment(segment);
        if name.is_empty() || name.contains(']') {
            return None;
        }
        steps.push(Step::Attribute(name));

        while !indexes.is_empty() {
            let (index, rest) = indexes.strip_prefix('[')?.split_once(']')?;
            if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            steps.push(Step::Index(index.parse().ok()?));
            indexes = rest;
        }
    }

    Some(steps)
}
