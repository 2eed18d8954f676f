use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::model::course::CourseRecord;

// Exact attribute match: `class="infobox wikitable"` is not an infobox.
static INFOBOX: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"[class="infobox"]"#).expect("infobox selector"));
static CAPTION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("caption").expect("caption selector"));
static CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").expect("td selector"));
static LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").expect("a selector"));

/// Pulls the course name and instructor out of a wiki page.
///
/// Infobox blocks are visited in document order. For each one the first
/// `<caption>` gives the name and the first `<td>` holding an `<a>` gives the
/// instructor. The first block yielding both wins; otherwise the record of the
/// last block visited is returned, possibly with empty fields. Malformed markup
/// is repaired by the parser, never reported.
pub fn extract_course(html: &str) -> CourseRecord {
    let document = Html::parse_document(html);
    let mut record = CourseRecord::empty();

    for infobox in document.select(&INFOBOX) {
        record = record_from_infobox(infobox);
        if record.is_complete() {
            break;
        }
    }

    record
}

fn record_from_infobox(infobox: ElementRef<'_>) -> CourseRecord {
    let name = infobox
        .select(&CAPTION)
        .next()
        .map(inner_text)
        .unwrap_or_default();

    let instructor = infobox
        .select(&CELL)
        .find_map(|cell| cell.select(&LINK).next())
        .map(inner_text)
        .unwrap_or_default();

    CourseRecord { name, instructor }
}

fn inner_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join("")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(body: &str) -> String {
        format!(
            "<!DOCTYPE html><html><head><title>CInWiki</title></head>\
             <body>{body}</body></html>"
        )
    }

    #[test]
    fn no_infobox_yields_empty_record() {
        let html = page(
            "<p>Nada aqui</p>\
             <table><caption>Outra</caption><tr><td><a href='#'>X</a></td></tr></table>",
        );
        assert_eq!(extract_course(&html), CourseRecord::empty());
    }

    #[test]
    fn single_infobox_yields_caption_and_first_linked_cell() {
        let html = page(
            r#"<table class="infobox">
                 <caption> Compiladores </caption>
                 <tr><th>Código</th><td>IF688</td></tr>
                 <tr><th>Professor</th>
                   <td><a href="/wiki/Fernando_Castor">Fernando Castor</a></td></tr>
                 <tr><th>Monitor</th><td><a href="/wiki/Outro">Outro</a></td></tr>
               </table>"#,
        );
        assert_eq!(
            extract_course(&html),
            CourseRecord::new("Compiladores", "Fernando Castor")
        );
    }

    #[test]
    fn multi_class_block_is_not_an_infobox() {
        let html = page(
            r#"<table class="infobox wikitable"><caption>Compiladores</caption>
               <tr><td><a href='#'>Fernando Castor</a></td></tr></table>"#,
        );
        assert_eq!(extract_course(&html), CourseRecord::empty());
    }

    #[test]
    fn first_complete_infobox_wins() {
        let html = page(
            r#"<table class="infobox"><caption>Sem professor</caption><tr><td>-</td></tr></table>
               <table class="infobox"><caption>Compiladores</caption>
                 <tr><td><a href='#'>Fernando Castor</a></td></tr></table>
               <table class="infobox"><caption>Redes</caption>
                 <tr><td><a href='#'>Outro</a></td></tr></table>"#,
        );
        assert_eq!(
            extract_course(&html),
            CourseRecord::new("Compiladores", "Fernando Castor")
        );
    }

    #[test]
    fn caption_without_link_keeps_scanning_and_returns_last_partial() {
        let html = page(
            r#"<table class="infobox"><caption>Primeira</caption>
                 <tr><td>sem link</td></tr></table>
               <table class="infobox"><caption>Segunda</caption>
                 <tr><td>sem link</td></tr></table>"#,
        );
        let record = extract_course(&html);
        assert_eq!(record.name, "Segunda");
        assert!(record.instructor.is_empty());
        assert!(!record.is_complete());
    }

    #[test]
    fn link_text_collapses_whitespace_and_nested_markup() {
        let html = page(
            r#"<table class="infobox"><caption>Engenharia de
                 Software</caption>
               <tr><td>Prof.: <a href='#'><b>Augusto</b>
                 Sampaio</a></td></tr></table>"#,
        );
        assert_eq!(
            extract_course(&html),
            CourseRecord::new("Engenharia de Software", "Augusto Sampaio")
        );
    }

    #[test]
    fn malformed_markup_is_repaired() {
        let html = r#"<table class="infobox"><caption>Compiladores</caption>
            <tr><td>Professor<td><a href=/wiki/F>Fernando Castor</table><p>resto"#;
        assert_eq!(
            extract_course(html),
            CourseRecord::new("Compiladores", "Fernando Castor")
        );
    }

    #[test]
    fn garbage_input_yields_empty_record() {
        assert_eq!(extract_course("<<<>>> </div></table> &&"), CourseRecord::empty());
        assert_eq!(extract_course(""), CourseRecord::empty());
    }
}
