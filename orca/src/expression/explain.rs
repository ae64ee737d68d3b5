use std::borrow::Cow;
use std::io::{BufWriter, ErrorKind, Write};

use ptree::print_config::UTF_CHARS;
use ptree::{write_tree_with, PrintConfig, Style, TreeItem};

use crate::error::OptResult;
use crate::expression::Expression;

impl<'a> TreeItem for &'a Expression {
    type Child = Self;

    fn write_self<W: Write>(&self, f: &mut W, style: &Style) -> std::io::Result<()> {
        match self.group_id() {
            Some(group_id) => write!(f, "{}", style.paint(format!("Group({})", group_id))),
            None => write!(f, "{}", style.paint(self.operator())),
        }
    }

    fn children(&self) -> Cow<[Self::Child]> {
        Cow::from(
            Expression::children(*self)
                .iter()
                .map(|c| &**c)
                .collect::<Vec<&'a Expression>>(),
        )
    }
}

pub fn explain<W: Write>(expr: &Expression, output: &mut W) -> std::io::Result<()> {
    let config = PrintConfig {
        indent: 3,
        characters: UTF_CHARS.into(),
        ..Default::default()
    };
    write_tree_with(&expr, output, &config)
}

pub fn explain_to_string(expr: &Expression) -> OptResult<String> {
    let mut buf = BufWriter::new(Vec::new());
    explain(expr, &mut buf)?;

    let bytes = buf.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)
        .map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e))?)
}
