use crate::{
    error::{Result, SpendreelError},
    types::{PlannedSegment, TimeWindow},
};

const SENTENCE_TERMINATOR: char = '.';

/// Split narration into sentences on `.` followed by whitespace or end of text.
///
/// A `.` inside a token such as `$5.00` does not end a sentence. Text ending with
/// the terminator yields a trailing empty sentence, which still counts.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c != SENTENCE_TERMINATOR {
            continue;
        }
        let at_boundary = match chars.peek() {
            Some((_, next)) => next.is_whitespace(),
            None => true,
        };
        if at_boundary {
            sentences.push(text[start..i].trim().to_string());
            start = i + c.len_utf8();
        }
    }
    sentences.push(text[start..].trim().to_string());

    sentences
}

/// Partition `[0, duration]` into `n` contiguous windows of equal length.
pub fn equal_windows(duration: f64, n: usize) -> Vec<TimeWindow> {
    (0..n)
        .map(|i| TimeWindow {
            start: i as f64 * duration / n as f64,
            end: if i + 1 == n {
                duration
            } else {
                (i + 1) as f64 * duration / n as f64
            },
        })
        .collect()
}

/// Pair every narration sentence with an equal share of the audio duration.
pub fn plan_segments(text: &str, duration: f64) -> Result<Vec<PlannedSegment>> {
    if !duration.is_finite() || duration <= 0.0 {
        return Err(SpendreelError::invalid_input(format!(
            "narration duration must be positive, got {duration}"
        )));
    }
    if text.trim().is_empty() {
        return Err(SpendreelError::invalid_input("narration text is empty"));
    }

    let sentences = split_sentences(text);
    if sentences.iter().all(|s| s.is_empty()) {
        return Err(SpendreelError::invalid_input(
            "narration has no sentences, only terminators",
        ));
    }
    let windows = equal_windows(duration, sentences.len());

    Ok(sentences
        .into_iter()
        .zip(windows)
        .enumerate()
        .map(|(index, (sentence, window))| PlannedSegment {
            index,
            sentence,
            window,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn windows_are_contiguous_and_cover_duration() {
        let text = "One. Two. Three. Four. Five. Six. Seven";
        let plan = plan_segments(text, 13.7).unwrap();

        assert_eq!(plan.len(), 7);
        assert_eq!(plan[0].window.start, 0.0);
        assert_eq!(plan[6].window.end, 13.7);
        for pair in plan.windows(2) {
            assert_eq!(pair[0].window.end, pair[1].window.start);
        }
        for seg in &plan {
            assert!((seg.window.duration() - 13.7 / 7.0).abs() < EPS);
        }
    }

    #[test]
    fn single_sentence_spans_whole_duration() {
        let plan = plan_segments("Only one sentence here", 4.25).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].window, TimeWindow { start: 0.0, end: 4.25 });
        assert_eq!(plan[0].sentence, "Only one sentence here");
    }

    #[test]
    fn non_positive_duration_is_invalid_input() {
        for duration in [0.0, -3.0, f64::NAN, f64::INFINITY] {
            let err = plan_segments("A sentence.", duration).unwrap_err();
            assert!(matches!(err, SpendreelError::InvalidInput { .. }));
        }
    }

    #[test]
    fn empty_narration_is_invalid_input() {
        let err = plan_segments("   \n", 10.0).unwrap_err();
        assert!(matches!(err, SpendreelError::InvalidInput { .. }));
    }

    #[test]
    fn terminators_alone_are_invalid_input() {
        for text in [".", ". .", " .  . . "] {
            let err = plan_segments(text, 6.0).unwrap_err();
            assert!(
                matches!(err, SpendreelError::InvalidInput { .. }),
                "{text:?} was accepted"
            );
        }
    }

    #[test]
    fn trailing_terminator_still_gets_a_window() {
        let plan = plan_segments("First line. Second line.", 9.0).unwrap();
        assert_eq!(plan.len(), 3);
        assert_eq!(plan[2].sentence, "");
        assert!((plan[2].window.duration() - 3.0).abs() < EPS);
    }

    #[test]
    fn decimal_amounts_do_not_split_sentences() {
        let sentences = split_sentences("You spent $5.00 on coffee. Groceries cost $120.50 this month.");
        assert_eq!(
            sentences,
            vec![
                "You spent $5.00 on coffee",
                "Groceries cost $120.50 this month",
                ""
            ]
        );
    }

    #[test]
    fn indices_follow_sentence_order() {
        let plan = plan_segments("a. b. c", 3.0).unwrap();
        let indices: Vec<_> = plan.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }
}
