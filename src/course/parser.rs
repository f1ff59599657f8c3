//! Course document parser.

use super::{Course, Lesson, ParsedDocument, Section};
use crate::error::{Result, SyllabusError};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;
use url::Url;

fn lesson_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| {
        Regex::new(r"(?i)^lesson\s+(\d+)\s*:\s*(.+)$").expect("lesson marker pattern is valid")
    })
}

/// Header field recognised at the top of a document.
enum HeaderField<'a> {
    Title(&'a str),
    Link(&'a str),
    Instructor(&'a str),
}

fn header_field(line: &str) -> Option<HeaderField<'_>> {
    let (key, value) = line.split_once(':')?;
    let value = value.trim();
    match key.trim().to_ascii_lowercase().as_str() {
        "course title" => Some(HeaderField::Title(value)),
        "course link" => Some(HeaderField::Link(value)),
        "course instructor" => Some(HeaderField::Instructor(value)),
        _ => None,
    }
}

fn lesson_link(line: &str) -> Option<&str> {
    let (key, value) = line.split_once(':')?;
    key.trim()
        .eq_ignore_ascii_case("lesson link")
        .then(|| value.trim())
}

/// Validate an optional link value; blank values are treated as absent.
fn parse_link(value: &str, what: &str) -> Result<Option<String>> {
    if value.is_empty() {
        return Ok(None);
    }
    Url::parse(value)
        .map(|_| Some(value.to_string()))
        .map_err(|e| SyllabusError::Format(format!("Invalid {} '{}': {}", what, value, e)))
}

/// Read and parse a course document from disk.
pub fn parse_file(path: &Path) -> Result<ParsedDocument> {
    let bytes = std::fs::read(path)?;
    let text = String::from_utf8_lossy(&bytes);
    parse_document(&text).map_err(|e| match e {
        SyllabusError::Format(msg) => {
            SyllabusError::Format(format!("{}: {}", path.display(), msg))
        }
        other => other,
    })
}

/// Parse raw course document text.
///
/// Fails with [`SyllabusError::Format`] when the `Course Title` header is
/// missing, a header link is not a valid URL, or a lesson number repeats.
pub fn parse_document(text: &str) -> Result<ParsedDocument> {
    let lines: Vec<&str> = text.lines().collect();
    let mut pos = lines
        .iter()
        .position(|l| !l.trim().is_empty())
        .ok_or_else(|| SyllabusError::Format("Document is empty".to_string()))?;

    let title = match header_field(lines[pos].trim()) {
        Some(HeaderField::Title(t)) if !t.is_empty() => t.to_string(),
        _ => {
            return Err(SyllabusError::Format(
                "First line must be 'Course Title: <title>'".to_string(),
            ))
        }
    };
    pos += 1;

    let mut link = None;
    let mut instructor = None;

    while pos < lines.len() {
        let line = lines[pos].trim();
        if line.is_empty() {
            pos += 1;
            continue;
        }
        match header_field(line) {
            Some(HeaderField::Link(value)) => link = parse_link(value, "course link")?,
            Some(HeaderField::Instructor(value)) => {
                instructor = (!value.is_empty()).then(|| value.to_string())
            }
            Some(HeaderField::Title(_)) => {
                return Err(SyllabusError::Format(
                    "Duplicate 'Course Title' header".to_string(),
                ))
            }
            None => break,
        }
        pos += 1;
    }

    let mut lessons: Vec<Lesson> = Vec::new();
    let mut sections: Vec<Section> = Vec::new();
    let mut current: Option<u32> = None;
    let mut buffer: Vec<&str> = Vec::new();

    let flush = |lesson: Option<u32>, buffer: &mut Vec<&str>, sections: &mut Vec<Section>| {
        let text = buffer.join("\n").trim().to_string();
        buffer.clear();
        if lesson.is_some() || !text.is_empty() {
            sections.push(Section {
                lesson_number: lesson,
                text,
            });
        }
    };

    while pos < lines.len() {
        let line = lines[pos];
        let Some(caps) = lesson_marker().captures(line.trim()) else {
            buffer.push(line);
            pos += 1;
            continue;
        };

        flush(current, &mut buffer, &mut sections);

        let number: u32 = caps[1]
            .parse()
            .map_err(|_| SyllabusError::Format(format!("Invalid lesson number in '{}'", line)))?;
        if lessons.iter().any(|l| l.number == number) {
            return Err(SyllabusError::Format(format!(
                "Lesson {} appears more than once",
                number
            )));
        }

        let mut lesson = Lesson {
            number,
            title: caps[2].trim().to_string(),
            link: None,
        };
        pos += 1;

        if let Some(value) = lines.get(pos).and_then(|l| lesson_link(l.trim())) {
            lesson.link = parse_link(value, "lesson link")?;
            pos += 1;
        }

        lessons.push(lesson);
        current = Some(number);
    }
    flush(current, &mut buffer, &mut sections);

    debug!("Parsed course '{}' with {} lessons", title, lessons.len());

    Ok(ParsedDocument {
        course: Course {
            title,
            link,
            instructor,
            lessons,
        },
        sections,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Course Title: Intro to X
Course Link: https://example.com/x
Course Instructor: Ada Lovelace

This course is about X.

Lesson 0: Welcome
Lesson Link: https://example.com/x/0
Hello and welcome.

Lesson 2: Going Further
Deeper material.
More lines here.
";

    #[test]
    fn test_parse_header_and_lessons() {
        let doc = parse_document(SAMPLE).unwrap();
        assert_eq!(doc.course.title, "Intro to X");
        assert_eq!(doc.course.link.as_deref(), Some("https://example.com/x"));
        assert_eq!(doc.course.instructor.as_deref(), Some("Ada Lovelace"));

        let numbers: Vec<u32> = doc.course.lessons.iter().map(|l| l.number).collect();
        assert_eq!(numbers, vec![0, 2]);
        assert_eq!(doc.course.lessons[0].link.as_deref(), Some("https://example.com/x/0"));
        assert_eq!(doc.course.lessons[1].link, None);

        assert_eq!(doc.sections.len(), 3);
        assert_eq!(doc.sections[0].lesson_number, None);
        assert_eq!(doc.sections[0].text, "This course is about X.");
        assert_eq!(doc.sections[1].text, "Hello and welcome.");
        assert_eq!(doc.sections[2].text, "Deeper material.\nMore lines here.");
    }

    #[test]
    fn test_missing_title_is_format_error() {
        let err = parse_document("Course Link: https://example.com\nLesson 1: A\n").unwrap_err();
        assert!(matches!(err, SyllabusError::Format(_)));

        let err = parse_document("   \n\n").unwrap_err();
        assert!(matches!(err, SyllabusError::Format(_)));
    }

    #[test]
    fn test_invalid_course_link_is_format_error() {
        let err = parse_document("Course Title: T\nCourse Link: not a url\n").unwrap_err();
        assert!(matches!(err, SyllabusError::Format(_)));
    }

    #[test]
    fn test_duplicate_lesson_is_format_error() {
        let text = "Course Title: T\n\nLesson 1: A\nx\nLesson 1: B\ny\n";
        assert!(matches!(parse_document(text), Err(SyllabusError::Format(_))));
    }

    #[test]
    fn test_optional_headers_may_be_absent() {
        let doc = parse_document("Course Title: Only Title\n\nLesson 1: One\nBody").unwrap();
        assert_eq!(doc.course.link, None);
        assert_eq!(doc.course.instructor, None);
        assert_eq!(doc.course.lessons.len(), 1);
        assert_eq!(doc.sections.len(), 1);
    }

    #[test]
    fn test_render_round_trip_preserves_lessons() {
        let doc = parse_document(SAMPLE).unwrap();
        let reparsed = parse_document(&doc.render()).unwrap();

        assert_eq!(reparsed, doc);
        let titles: Vec<&str> = reparsed.course.lessons.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, vec!["Welcome", "Going Further"]);
    }

    #[test]
    fn test_marker_is_case_insensitive() {
        let doc = parse_document("Course Title: T\nLESSON 3:  Spaced Title  \ntext").unwrap();
        assert_eq!(doc.course.lessons[0].number, 3);
        assert_eq!(doc.course.lessons[0].title, "Spaced Title");
    }
}
