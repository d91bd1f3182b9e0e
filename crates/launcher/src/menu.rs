use std::future::Future;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

pub const MENU: &str = "
Choose an option:
1. Run tool bridge + agent demo (Gemini + bridge)
2. Run tool bridge + API server (HTTP API)
3. Run all (API server + tool bridge + agent demo)
4. Exit
";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuChoice {
    BridgeAndAgent,
    ApiAndBridge,
    All,
    Exit,
}

impl MenuChoice {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(Self::BridgeAndAgent),
            "2" => Some(Self::ApiAndBridge),
            "3" => Some(Self::All),
            "4" => Some(Self::Exit),
            _ => None,
        }
    }
}

/// Show the menu until a valid choice is entered. End of input counts as
/// [`MenuChoice::Exit`].
pub async fn prompt<R, W>(input: &mut R, output: &mut W) -> std::io::Result<MenuChoice>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        output.write_all(MENU.as_bytes()).await?;
        output.write_all(b"\nEnter your choice (1-4): ").await?;
        output.flush().await?;

        let mut line = String::new();
        if input.read_line(&mut line).await? == 0 {
            return Ok(MenuChoice::Exit);
        }
        match MenuChoice::parse(&line) {
            Some(choice) => return Ok(choice),
            None => output.write_all(b"Invalid choice. Please try again.\n").await?,
        }
    }
}

/// [`prompt`], abandoned with [`MenuChoice::Exit`] as soon as `interrupt`
/// resolves.
pub async fn prompt_until<R, W, F>(input: &mut R, output: &mut W, interrupt: F) -> std::io::Result<MenuChoice>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    F: Future<Output = ()>,
{
    tokio::select! {
        choice = prompt(input, output) => choice,
        _ = interrupt => Ok(MenuChoice::Exit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_four_options() {
        assert_eq!(MenuChoice::parse("1"), Some(MenuChoice::BridgeAndAgent));
        assert_eq!(MenuChoice::parse(" 2\n"), Some(MenuChoice::ApiAndBridge));
        assert_eq!(MenuChoice::parse("3"), Some(MenuChoice::All));
        assert_eq!(MenuChoice::parse("4"), Some(MenuChoice::Exit));
        assert_eq!(MenuChoice::parse("5"), None);
        assert_eq!(MenuChoice::parse("one"), None);
    }

    #[tokio::test]
    async fn invalid_input_reprompts() {
        let mut input: &[u8] = b"9\nabc\n2\n";
        let mut out = Vec::new();
        let choice = prompt(&mut input, &mut out).await.unwrap();
        assert_eq!(choice, MenuChoice::ApiAndBridge);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches("Invalid choice").count(), 2);
        assert_eq!(text.matches("Enter your choice").count(), 3);
    }

    #[tokio::test]
    async fn end_of_input_exits() {
        let mut input: &[u8] = b"";
        let mut out = Vec::new();
        assert_eq!(prompt(&mut input, &mut out).await.unwrap(), MenuChoice::Exit);
    }

    #[tokio::test]
    async fn interrupt_while_waiting_for_input_exits() {
        // writer half stays open so the read never completes
        let (_writer, reader) = tokio::io::duplex(64);
        let mut input = tokio::io::BufReader::new(reader);
        let mut out = Vec::new();
        let choice = prompt_until(&mut input, &mut out, std::future::ready(())).await.unwrap();
        assert_eq!(choice, MenuChoice::Exit);
    }

    #[tokio::test]
    async fn input_wins_without_interrupt() {
        let mut input: &[u8] = b"3\n";
        let mut out = Vec::new();
        let choice = prompt_until(&mut input, &mut out, std::future::pending()).await.unwrap();
        assert_eq!(choice, MenuChoice::All);
    }
}
