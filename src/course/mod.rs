//! Course data model and the course document parser.
//!
//! A course document is a plain-text file with a short header followed by
//! lesson sections:
//!
//! ```text
//! Course Title: Building Towards Computer Use
//! Course Link: https://example.com/computer-use
//! Course Instructor: Colt Steele
//!
//! Lesson 0: Introduction
//! Lesson Link: https://example.com/computer-use/lesson-0
//! Welcome to the course...
//! ```

mod parser;

pub use parser::{parse_document, parse_file};

use serde::{Deserialize, Serialize};

/// A course loaded from the corpus. The title is its unique identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub title: String,
    pub link: Option<String>,
    pub instructor: Option<String>,
    pub lessons: Vec<Lesson>,
}

impl Course {
    /// Find a lesson by its number.
    pub fn lesson(&self, number: u32) -> Option<&Lesson> {
        self.lessons.iter().find(|l| l.number == number)
    }
}

/// A lesson within a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    /// Lesson number, unique within its course but not necessarily contiguous.
    pub number: u32,
    pub title: String,
    pub link: Option<String>,
}

/// A run of raw text attributed to one lesson, or to the course itself when
/// it appears before the first lesson marker.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub lesson_number: Option<u32>,
    pub text: String,
}

/// Output of the parser: the course plus the raw text of each section, in
/// document order.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    pub course: Course,
    pub sections: Vec<Section>,
}

impl ParsedDocument {
    /// Serialize back into the course document format.
    pub fn render(&self) -> String {
        let course = &self.course;
        let mut out = format!("Course Title: {}\n", course.title);
        if let Some(link) = &course.link {
            out.push_str(&format!("Course Link: {}\n", link));
        }
        if let Some(instructor) = &course.instructor {
            out.push_str(&format!("Course Instructor: {}\n", instructor));
        }

        for section in &self.sections {
            out.push('\n');
            if let Some(number) = section.lesson_number {
                if let Some(lesson) = course.lesson(number) {
                    out.push_str(&format!("Lesson {}: {}\n", lesson.number, lesson.title));
                    if let Some(link) = &lesson.link {
                        out.push_str(&format!("Lesson Link: {}\n", link));
                    }
                }
            }
            if !section.text.is_empty() {
                out.push_str(&section.text);
                out.push('\n');
            }
        }

        out
    }
}

/// A chunk of course text, the unit of semantic indexing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseChunk {
    /// Title of the owning course.
    pub course_title: String,
    /// Lesson the chunk came from; `None` for course-level text.
    pub lesson_number: Option<u32>,
    /// Zero-based, contiguous position within the course.
    pub chunk_index: u32,
    pub content: String,
}
