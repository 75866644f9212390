//! Splitting a command line into whitespace-delimited tokens.
//!
//! Quotes are not removed here; they only keep the whitespace they enclose
//! from splitting a token. Unquoting is the parser's job.

/// A token borrowed from the input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    /// Raw token text, quotes included.
    pub text: &'a str,
    /// Byte offset just past the end of the token in the input line.
    pub end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Start,
    ReadingWord,
    ReadingSingleQuote,
    ReadingDoubleQuote,
}

/// Characters separating tokens.
pub fn is_splitter(ch: char) -> bool {
    matches!(ch, ' ' | '\t')
}

struct LexingFSM<'a> {
    input: &'a str,
    state: LexingState,
    word_start: usize,
}

impl<'a> LexingFSM<'a> {
    fn new(input: &'a str) -> Self {
        LexingFSM {
            input,
            state: LexingState::Start,
            word_start: 0,
        }
    }

    fn make_tokens(mut self) -> Vec<Token<'a>> {
        let mut out = Vec::new();

        for (pos, ch) in self.input.char_indices() {
            match self.state {
                LexingState::Start => self.handle_start(pos, ch),
                LexingState::ReadingWord => self.handle_word(pos, ch, &mut out),
                LexingState::ReadingSingleQuote => {
                    if ch == '\'' {
                        self.state = LexingState::ReadingWord;
                    }
                }
                LexingState::ReadingDoubleQuote => {
                    if ch == '"' {
                        self.state = LexingState::ReadingWord;
                    }
                }
            }
        }

        // An unterminated quote swallows the rest of the line.
        if self.state != LexingState::Start {
            self.push_word(self.input.len(), &mut out);
        }
        out
    }

    fn handle_start(&mut self, pos: usize, ch: char) {
        if is_splitter(ch) {
            return;
        }
        self.word_start = pos;
        self.state = match ch {
            '\'' => LexingState::ReadingSingleQuote,
            '"' => LexingState::ReadingDoubleQuote,
            _ => LexingState::ReadingWord,
        };
    }

    fn handle_word(&mut self, pos: usize, ch: char, out: &mut Vec<Token<'a>>) {
        match ch {
            c if is_splitter(c) => {
                self.push_word(pos, out);
                self.state = LexingState::Start;
            }
            '\'' => self.state = LexingState::ReadingSingleQuote,
            '"' => self.state = LexingState::ReadingDoubleQuote,
            _ => {}
        }
    }

    fn push_word(&self, end: usize, out: &mut Vec<Token<'a>>) {
        let text = &self.input[self.word_start..end];
        if !text.is_empty() {
            out.push(Token { text, end });
        }
    }
}

/// Tokenize a line.
///
/// Tokens are separated by runs of spaces and tabs outside quotes.
pub fn split_into_tokens(line: &str) -> Vec<Token<'_>> {
    LexingFSM::new(line).make_tokens()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(line: &str) -> Vec<&str> {
        split_into_tokens(line).into_iter().map(|t| t.text).collect()
    }

    #[test]
    fn splits_on_spaces_and_tabs() {
        assert_eq!(texts("ls  -l\t/tmp"), ["ls", "-l", "/tmp"]);
        assert!(texts(" \t ").is_empty());
    }

    #[test]
    fn quotes_keep_whitespace_inside_one_token() {
        assert_eq!(
            texts(r#"echo "a b" 'c d' x"y z""#),
            ["echo", r#""a b""#, "'c d'", r#"x"y z""#]
        );
    }

    #[test]
    fn unterminated_quote_runs_to_end_of_line() {
        assert_eq!(texts(r#"echo "a | b"#), ["echo", r#""a | b"#]);
    }

    #[test]
    fn offsets_point_past_each_token() {
        let line = "cat f | wc";
        let tokens = split_into_tokens(line);
        assert_eq!(tokens[2].text, "|");
        assert_eq!(&line[tokens[2].end..], " wc");
    }
}
