//! Text form of a feed-forward network.
//!
//! The description is line oriented, `#` starts a comment running to the end
//! of the line and numbers may be spread over any number of lines. Sections
//! appear in this fixed order:
//!
//! ```text
//! input <n>            # n lines of "<min> <max>", one per input
//! planes <p> <n> <h1> ... <m>
//! wgt 0 <n> <h1>       # h1 rows of n weights
//! wgt 1 <h1> <h2>      # one wgt section per plane transition
//! bias 1 <h1>          # one bias section per non-input plane
//! bias 2 <h2>
//! output <m>           # m lines of "<min> <max>", one per output
//! ```

use std::iter::Peekable;
use std::vec::IntoIter;

use super::error::FormatError;
use super::network::{Bounds, Layer, NeuralNetwork};

struct Tokens<'a> {
    tokens: Peekable<IntoIter<(usize, &'a str)>>,
    line: usize,
}

impl<'a> Tokens<'a> {
    fn new(text: &'a str) -> Self {
        let tokens: Vec<(usize, &str)> = text
            .lines()
            .enumerate()
            .flat_map(|(idx, line)| {
                let content = line.find('#').map_or(line, |pos| &line[..pos]);
                content.split_whitespace().map(move |token| (idx + 1, token))
            })
            .collect();

        Self {
            tokens: tokens.into_iter().peekable(),
            line: 1,
        }
    }

    fn next(&mut self, expected: &str) -> Result<&'a str, FormatError> {
        match self.tokens.next() {
            Some((line, token)) => {
                self.line = line;
                Ok(token)
            }
            None => Err(FormatError::UnexpectedEof {
                line: self.line,
                expected: expected.to_string(),
            }),
        }
    }

    fn keyword(&mut self, keyword: &str) -> Result<(), FormatError> {
        let token = self.next(&format!("'{keyword}'"))?;
        if token == keyword {
            Ok(())
        } else {
            Err(FormatError::UnexpectedToken {
                line: self.line,
                expected: format!("'{keyword}'"),
                found: token.to_string(),
            })
        }
    }

    fn count(&mut self, what: &str) -> Result<usize, FormatError> {
        let token = self.next(what)?;
        token
            .parse::<usize>()
            .map_err(|_| FormatError::UnexpectedToken {
                line: self.line,
                expected: what.to_string(),
                found: token.to_string(),
            })
    }

    /// Reads a count and checks it against the dimension implied by the topology
    fn declared(&mut self, section: &str, expected: usize) -> Result<(), FormatError> {
        let found = self.count(&format!("size of {section}"))?;
        if found == expected {
            Ok(())
        } else {
            Err(FormatError::DimensionMismatch {
                line: self.line,
                section: section.to_string(),
                expected,
                found,
            })
        }
    }

    fn number(&mut self, what: &str) -> Result<f64, FormatError> {
        let token = self.next(what)?;
        match token.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(FormatError::InvalidNumber {
                line: self.line,
                token: token.to_string(),
            }),
        }
    }

    fn peek_is_number(&mut self) -> bool {
        self.tokens
            .peek()
            .is_some_and(|(_, token)| token.parse::<f64>().is_ok())
    }

    /// Reads exactly `expected` numbers, reporting how many were really present
    /// when the section is shorter or longer than declared.
    fn values(&mut self, section: &str, expected: usize) -> Result<Vec<f64>, FormatError> {
        let mut values = Vec::with_capacity(expected.min(self.tokens.len()));
        while values.len() < expected {
            if !self.peek_is_number() {
                let line = self.tokens.peek().map_or(self.line, |(line, _)| *line);
                return Err(FormatError::DimensionMismatch {
                    line,
                    section: section.to_string(),
                    expected,
                    found: values.len(),
                });
            }
            values.push(self.number(section)?);
        }

        let mut extra = 0;
        while self.peek_is_number() {
            self.next(section)?;
            extra += 1;
        }
        if extra > 0 {
            return Err(FormatError::DimensionMismatch {
                line: self.line,
                section: section.to_string(),
                expected,
                found: expected + extra,
            });
        }

        Ok(values)
    }

    /// Number of consecutive numbers ahead of the cursor
    fn numbers_ahead(&self) -> usize {
        self.tokens
            .clone()
            .take_while(|(_, token)| token.parse::<f64>().is_ok())
            .count()
    }

    /// `count * per_entry`, a dimension mismatch when the declared size overflows
    fn size(&self, section: &str, count: usize, per_entry: usize) -> Result<usize, FormatError> {
        count
            .checked_mul(per_entry)
            .ok_or_else(|| FormatError::DimensionMismatch {
                line: self.line,
                section: section.to_string(),
                expected: count,
                found: self.numbers_ahead() / per_entry,
            })
    }

    fn bounds(&mut self, section: &str, count: usize) -> Result<Vec<Bounds>, FormatError> {
        let size = self.size(section, count, 2)?;
        let values = self.values(section, size)?;
        values
            .chunks_exact(2)
            .map(|pair| {
                let (min, max) = (pair[0], pair[1]);
                if min < max {
                    Ok(Bounds::new(min, max))
                } else {
                    Err(FormatError::DegenerateRange {
                        line: self.line,
                        section: section.to_string(),
                        min,
                        max,
                    })
                }
            })
            .collect()
    }
}

pub(crate) fn parse(text: &str) -> Result<NeuralNetwork, FormatError> {
    let mut tokens = Tokens::new(text);

    tokens.keyword("input")?;
    let input_count = tokens.count("number of inputs")?;
    let input_bounds = tokens.bounds("input bounds", input_count)?;

    tokens.keyword("planes")?;
    let plane_count = tokens.count("number of planes")?;
    if plane_count < 2 {
        return Err(FormatError::DimensionMismatch {
            line: tokens.line,
            section: "planes".to_string(),
            expected: 2,
            found: plane_count,
        });
    }
    let mut planes = Vec::with_capacity(plane_count.min(tokens.tokens.len()));
    for _ in 0..plane_count {
        let size = tokens.count("plane size")?;
        if size == 0 {
            return Err(FormatError::UnexpectedToken {
                line: tokens.line,
                expected: "non-empty plane".to_string(),
                found: "0".to_string(),
            });
        }
        planes.push(size);
    }
    if planes[0] != input_count {
        return Err(FormatError::DimensionMismatch {
            line: tokens.line,
            section: "input plane".to_string(),
            expected: input_count,
            found: planes[0],
        });
    }

    let mut weights = Vec::with_capacity(plane_count - 1);
    for (idx, pair) in planes.windows(2).enumerate() {
        let (from, to) = (pair[0], pair[1]);
        tokens.keyword("wgt")?;
        tokens.declared("wgt plane index", idx)?;
        tokens.declared(&format!("wgt {idx} source plane"), from)?;
        tokens.declared(&format!("wgt {idx} target plane"), to)?;
        let section = format!("wgt {idx}");
        let size = tokens.size(&section, to, from)?;
        weights.push(tokens.values(&section, size)?);
    }

    let mut layers = Vec::with_capacity(plane_count - 1);
    for (idx, weights) in weights.into_iter().enumerate() {
        let plane = idx + 1;
        tokens.keyword("bias")?;
        tokens.declared("bias plane index", plane)?;
        tokens.declared(&format!("bias {plane}"), planes[plane])?;
        let bias = tokens.values(&format!("bias {plane}"), planes[plane])?;
        layers.push(Layer {
            inputs: planes[idx],
            weights,
            bias,
        });
    }

    tokens.keyword("output")?;
    let output_count = *planes.last().unwrap_or(&0);
    tokens.declared("output plane", output_count)?;
    let output_bounds = tokens.bounds("output bounds", output_count)?;

    if let Some((line, token)) = tokens.tokens.next() {
        return Err(FormatError::TrailingData {
            line,
            token: token.to_string(),
        });
    }

    Ok(NeuralNetwork {
        input_bounds,
        planes,
        layers,
        output_bounds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = "\
# two inputs, one hidden plane of three units, two outputs
input 2
0.0 1.0   # first
-2.0 2.0
planes 3 2 3 2
wgt 0 2 3
0.1 0.2
0.3 0.4
0.5 0.6
wgt 1 3 2
1.0 1.0 1.0 -1.0 -1.0 -1.0
bias 1 3
0.0 0.0 0.0
bias 2 2
0.5 -0.5
output 2
0.0 10.0
-1.0 0.0
";

    #[test]
    fn test_parse_valid_network() {
        let net = parse(VALID).unwrap();
        assert_eq!(net.planes(), &[2, 3, 2]);
        assert_eq!(net.input_bounds()[1], Bounds::new(-2.0, 2.0));
        assert_eq!(net.output_bounds()[0], Bounds::new(0.0, 10.0));
        assert_eq!(net.layers.len(), 2);
        assert_eq!(net.layers[0].weights, vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
        assert_eq!(net.layers[1].bias, vec![0.5, -0.5]);
    }

    #[test]
    fn test_missing_weight_is_dimension_mismatch() {
        let text = VALID.replace("0.5 0.6\n", "0.5\n");
        match parse(&text) {
            Err(FormatError::DimensionMismatch {
                expected, found, ..
            }) => {
                assert_eq!(expected, 6);
                assert_eq!(found, 5);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_extra_bias_is_dimension_mismatch() {
        let text = VALID.replace("0.5 -0.5", "0.5 -0.5 0.7");
        assert!(matches!(
            parse(&text),
            Err(FormatError::DimensionMismatch {
                expected: 2,
                found: 3,
                ..
            })
        ));
    }

    #[test]
    fn test_input_count_must_match_first_plane() {
        let text = VALID.replace("planes 3 2 3 2", "planes 3 4 3 2");
        assert!(matches!(
            parse(&text),
            Err(FormatError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_output_section_must_match_last_plane() {
        let text = VALID.replace("output 2", "output 3");
        assert!(matches!(
            parse(&text),
            Err(FormatError::DimensionMismatch {
                expected: 2,
                found: 3,
                ..
            })
        ));
    }

    #[test]
    fn test_wrong_weight_shape_is_rejected() {
        let text = VALID.replace("wgt 1 3 2", "wgt 1 2 3");
        assert!(matches!(
            parse(&text),
            Err(FormatError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_degenerate_bounds_are_rejected() {
        let text = VALID.replace("-2.0 2.0", "2.0 2.0");
        assert!(matches!(
            parse(&text),
            Err(FormatError::DegenerateRange { line: 4, .. })
        ));
    }

    #[test]
    fn test_invalid_number_reports_line() {
        let text = VALID.replace("0.3 0.4", "0.3 NaN");
        match parse(&text) {
            Err(FormatError::InvalidNumber { line, token }) => {
                assert_eq!(line, 8);
                assert_eq!(token, "NaN");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_truncated_description() {
        let end = VALID.find("output").unwrap();
        assert!(matches!(
            parse(&VALID[..end]),
            Err(FormatError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_sections_out_of_order() {
        let text = VALID.replace("bias 1 3\n0.0 0.0 0.0\n", "");
        let text = text.replace("wgt 1 3 2", "bias 1 3 0.0 0.0 0.0\nwgt 1 3 2");
        assert!(matches!(
            parse(&text),
            Err(FormatError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn test_trailing_data() {
        let text = format!("{VALID}\nextra");
        assert!(matches!(
            parse(&text),
            Err(FormatError::TrailingData { .. })
        ));
    }

    #[test]
    fn test_huge_input_count_is_dimension_mismatch() {
        match parse("input 9223372036854775808\n0 1\n") {
            Err(FormatError::DimensionMismatch { section, found, .. }) => {
                assert_eq!(section, "input bounds");
                assert_eq!(found, 1);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_huge_plane_count_is_rejected() {
        assert!(matches!(
            parse("input 1\n0 1\nplanes 4611686018427387904 1 1\n"),
            Err(FormatError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_huge_weight_section_is_dimension_mismatch() {
        let text = "input 1\n0 1\nplanes 2 1 18446744073709551615\nwgt 0 1 18446744073709551615\n0.5\n";
        assert!(matches!(
            parse(text),
            Err(FormatError::DimensionMismatch { .. })
        ));
    }
}
