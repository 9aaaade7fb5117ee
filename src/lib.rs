//! A layout engine that turns the report of a tutoring session into a paginated, styled PDF
//! document. The report (its title, the topics covered, an executive summary, a progress
//! evaluation and a practice quiz) is read from the JSON produced by the application backend
//! and drawn section by section onto A4 pages, with a branded header band and a footer that
//! numbers every page.
//!
//! The entry point is the `ReportGenerator` struct: it is built from a set of `GeneratorOptions`
//! and then consumed by `generate_report`, which lays the report out, serializes the PDF and hands
//! it to a `FileDelivery`. The outcome is always returned as a value, never as a panic, so that
//! the calling application can report it back to the user as it sees fit.

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

/// This module contains the `ContextError` type which is the error type used throughout this library.
///
/// The reason why this type has been implemented is to uniform the error reporting without delving
/// too deep into specific error codes which for such library would be too many and definitely out of scope.
/// Whenever an error is propagated from a function of another crate, its message is kept
/// in the `source_error` field next to the explanation of what this crate was doing.
///
/// The `ContextError` type implements `std::fmt::Display` and can be serialized, so that a failed
/// generation can be returned as JSON to the calling application.
pub mod error;

/// The module where the input of the engine, the `SessionReport`, is described.
///
/// Every field of the report is optional, since the backend produces partial reports whenever
/// the analysis of a transcript is incomplete. A section of the document is only drawn when its
/// defining data is present, see `Topics::is_present` and the like.
pub mod report;

/// The `Canvas` trait is the page-oriented drawing surface the layout is written against.
///
/// Coordinates are expressed in millimetres from the top-left corner of the page. The PDF backend
/// in the `pdf` module implements it, but any other surface can be used through
/// `ReportGenerator::compose`.
pub mod canvas;

/// The module where the fonts that end up in the document are handled.
///
/// TrueType fonts are embedded as `Type0` fonts with an `Identity-H` encoding, a widths array and
/// a `ToUnicode` map, so that any Unicode text they cover can be drawn, searched and copied.
/// Without them, the standard Helvetica family of the PDF viewer is used together with its
/// metrics.
pub mod fonts;

/// Text styles and the choice between the embedded fonts and the built-in ones.
///
/// The choice is made once, when the generator is built, and is represented by the `Typography`
/// enum. When the built-in fonts are used the text is sanitized first, since they can only draw
/// a small subset of the characters the reports may contain.
pub mod typography;

/// The cursor-based layout: word wrapping, page breaking and the text blocks the sections are made of.
///
/// The `Composer` keeps track of the vertical position on the current page and checks, before any
/// block is drawn, that it fits above the bottom margin, starting a new page otherwise.
pub mod layout;

/// The sections of the report and the way each of them is drawn.
pub mod sections;

/// The module where the `PdfDocument` interface for writing PDF documents is presented.
///
/// # Introduction
///
/// The `PdfDocument` struct collects the drawing operations of every page until the document is
/// written with `save_to_bytes`. Only then are the fonts that were actually used inserted into the
/// document, together with the document information dictionary and the page tree.
///
/// The identifier of the document is supplied by the caller rather than generated randomly,
/// so that the same report always yields the same bytes and the output can be tested.
pub mod pdf;

/// The `ReportGenerator`, its options and the outcome of a generation.
pub mod generator;

/// Where the finished documents are delivered.
pub mod delivery;

/// The JSON configuration of the engine: font files, branding and output directory.
pub mod configuration;
