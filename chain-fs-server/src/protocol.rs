use derive_more::Display;

/// 一行请求。命令字不区分大小写，参数按单个空格切分，至多切成三段。
#[derive(Debug, PartialEq, Eq)]
pub enum Request<'a> {
    Create(&'a str),
    /// 文件名，以及第二个空格之后的全部内容
    Write(&'a str, &'a str),
    Read(&'a str),
    Delete(&'a str),
    List,
    Quit,
}

#[derive(Debug, Display, PartialEq, Eq)]
pub enum ParseError {
    #[display(fmt = "Filename required.")]
    FilenameRequired,
    #[display(fmt = "Filename and content required.")]
    FilenameAndContentRequired,
    #[display(fmt = "Unknown command.")]
    UnknownCommand,
}

impl<'a> Request<'a> {
    /// 空行返回 `Ok(None)`
    pub fn parse(line: &'a str) -> Result<Option<Self>, ParseError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let mut parts = line.splitn(3, ' ');
        let command = parts.next().unwrap_or_default().to_ascii_uppercase();
        let name = parts.next();
        let content = parts.next();

        let request = match (command.as_str(), name, content) {
            ("CREATE", Some(name), _) => Self::Create(name),
            ("WRITE", Some(name), Some(content)) => Self::Write(name, content),
            ("READ", Some(name), _) => Self::Read(name),
            ("DELETE", Some(name), _) => Self::Delete(name),
            ("LIST", ..) => Self::List,
            ("QUIT", ..) => Self::Quit,
            ("CREATE" | "READ" | "DELETE", None, _) => return Err(ParseError::FilenameRequired),
            ("WRITE", ..) => return Err(ParseError::FilenameAndContentRequired),
            _ => return Err(ParseError::UnknownCommand),
        };

        Ok(Some(request))
    }
}
