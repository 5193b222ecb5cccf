/*!
 * Tests for recovering numbered translations from model output
 */

use nichi::translation::parse_response;
use nichi::translation::parsing::NumberedResponseParser;
use crate::common;

#[test]
fn test_parse_response_withMultilineEntry_shouldKeepLines() {
    let originals = common::strings(&["Hello\nworld"]);
    assert_eq!(parse_response("1. Halo\ndunia", &originals), vec!["Halo\ndunia"]);
}

#[test]
fn test_parse_response_withMissingSecondEntry_shouldKeepOriginal() {
    let originals = common::strings(&["Hello", "World"]);
    assert_eq!(parse_response("1. Halo", &originals), vec!["Halo", "World"]);
}

#[test]
fn test_parse_response_withModelPreamble_shouldIgnoreIt() {
    let originals = common::strings(&["One", "Two"]);
    let response = "Here are the translations:\n\n1. Satu\n2. Dua\n";
    assert_eq!(parse_response(response, &originals), vec!["Satu", "Dua"]);
}

#[test]
fn test_parse_response_withUnnumberedLines_shouldFallBackToPositions() {
    let originals = common::strings(&["One", "Two", "Three"]);
    let response = "Satu\nDua\nTiga";
    assert_eq!(parse_response(response, &originals), vec!["Satu", "Dua", "Tiga"]);
}

#[test]
fn test_parser_expectedNumber_shouldAdvanceAsEntriesFlush() {
    let mut parser = NumberedResponseParser::new();
    assert_eq!(parser.expected_number(), 1);

    parser.feed_line("1. Satu");
    parser.feed_line("2. Dua");
    parser.feed_line("3. Tiga");

    assert_eq!(parser.finish(), vec!["Satu", "Dua", "Tiga"]);
}
