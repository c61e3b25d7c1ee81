use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
};

/// Lists `files` and asks for a `y` answer. End of input counts as "no".
pub fn confirm<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    files: &[PathBuf],
) -> io::Result<bool> {
    writeln!(output, "Found {} file(s) to convert:", files.len())?;
    for file in files {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| file.to_string_lossy());
        writeln!(output, "  - {name}")?;
    }
    write!(output, "\nConvert {} file(s)? [y/N]: ", files.len())?;
    output.flush()?;

    let mut answer = String::new();
    if input.read_line(&mut answer)? == 0 {
        return Ok(false);
    }
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}
