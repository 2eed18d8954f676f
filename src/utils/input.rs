use std::io;
use std::io::{BufRead, Write};

/// Prints `prompt` and reads one line; `None` once stdin is closed.
pub fn input(prompt: &str) -> io::Result<Option<String>> {
    read_prompted(&mut io::stdin().lock(), &mut io::stdout(), prompt)
}

/// Like [`input`], with surrounding whitespace removed.
pub fn input_trim(prompt: &str) -> io::Result<Option<String>> {
    Ok(input(prompt)?.map(|line| line.trim().to_string()))
}

fn read_prompted<R: BufRead, W: Write>(
    reader: &mut R,
    writer: &mut W,
    prompt: &str,
) -> io::Result<Option<String>> {
    write!(writer, "{}", prompt)?;
    writer.flush()?; // prompt must show before blocking on stdin

    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}
