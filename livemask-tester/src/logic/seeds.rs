use anyhow::{Context, Result, bail};

/// Widest range a single `a..b` token may expand to.
const MAX_RANGE_LEN: u64 = 10_000;

/// Split a comma separated CLI value into trimmed, non-empty tokens.
#[must_use]
pub fn split_csv(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Resolve CLI seed tokens into concrete seeds.
///
/// Accepts literal integers (negative values use their magnitude) and
/// half-open ranges written `start..end`. Duplicates are dropped, first
/// occurrence wins.
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<u64>> {
    let mut seeds: Vec<u64> = Vec::new();

    for token in tokens {
        if token.is_empty() {
            continue;
        }

        if let Some((start, end)) = token.split_once("..") {
            let start = parse_seed(start).with_context(|| format!("Invalid range start in '{token}'"))?;
            let end = parse_seed(end).with_context(|| format!("Invalid range end in '{token}'"))?;
            if end <= start {
                bail!("Seed range '{token}' is empty");
            }
            if end - start > MAX_RANGE_LEN {
                bail!("Seed range '{token}' spans more than {MAX_RANGE_LEN} seeds");
            }
            for seed in start..end {
                push_unique(&mut seeds, seed);
            }
            continue;
        }

        let seed = parse_seed(token).with_context(|| format!("Unrecognized seed '{token}'"))?;
        push_unique(&mut seeds, seed);
    }

    if seeds.is_empty() {
        bail!("No seeds provided");
    }
    Ok(seeds)
}

fn parse_seed(raw: &str) -> Result<u64> {
    let raw = raw.trim();
    if let Ok(value) = raw.parse::<u64>() {
        return Ok(value);
    }
    let value = raw.parse::<i64>()?;
    Ok(value.unsigned_abs())
}

fn push_unique(seeds: &mut Vec<u64>, seed: u64) {
    if !seeds.contains(&seed) {
        seeds.push(seed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_csv_drops_blanks() {
        assert_eq!(split_csv(" 1, ,2,,3 "), vec!["1", "2", "3"]);
    }

    #[test]
    fn resolves_literals_ranges_and_negatives() {
        let tokens = split_csv("7,-3,1..4,2");
        let seeds = resolve_seed_inputs(&tokens).unwrap();
        assert_eq!(seeds, vec![7, 3, 1, 2]);
    }

    #[test]
    fn rejects_garbage_and_empty_ranges() {
        assert!(resolve_seed_inputs(&split_csv("abc")).is_err());
        assert!(resolve_seed_inputs(&split_csv("5..5")).is_err());
        assert!(resolve_seed_inputs(&[]).is_err());
    }
}
