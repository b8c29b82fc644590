//! Interactive REPL.
//!
//! Statements accumulate until they are syntactically complete (balanced
//! delimiters and a terminating `;`), then run against one persistent
//! interpreter. Variables defined earlier in the session stay visible, and
//! rebinding one is the same error it would be in a script.

use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use crate::error::Source;
use crate::interpreter::Interpreter;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const HISTORY_FILE: &str = ".construe-history";

pub struct Repl {
    interp: Interpreter,
}

enum CommandResult {
    Print(String),
    Clear,
    Quit,
}

impl Repl {
    pub fn new(debug: u32) -> Self {
        Repl { interp: Interpreter::with_debug(debug) }
    }

    fn handle_command(&self, command: &str) -> Option<CommandResult> {
        match command.trim() {
            ":help" | ":h" | ":?" => Some(CommandResult::Print(self.help_message())),
            ":env" | ":e" => {
                let mut out = Vec::new();
                self.interp.print_env(&mut out).ok();
                let text = String::from_utf8_lossy(&out).into_owned();
                Some(CommandResult::Print(if text.is_empty() {
                    "(no variables defined)".to_string()
                } else {
                    text
                }))
            }
            ":factories" | ":f" => {
                let mut out = Vec::new();
                self.interp.print_factories(&mut out).ok();
                let text = String::from_utf8_lossy(&out).into_owned();
                Some(CommandResult::Print(if text.is_empty() {
                    "(no factories registered)".to_string()
                } else {
                    text
                }))
            }
            ":clear" | ":cls" => Some(CommandResult::Clear),
            ":quit" | ":exit" | ":q" => Some(CommandResult::Quit),
            _ => None,
        }
    }

    fn help_message(&self) -> String {
        format!(
            r#"{}

{}
  :help, :h, :?     Show this help message
  :env, :e          Print every defined variable, grouped by type
  :factories, :f    List registered factories and their concrete types
  :clear, :cls      Clear the screen
  :quit, :exit, :q  Exit the REPL

{}
  int x = 3;
  b = true;
  Animal a = Cow(name("daisy"), age(x));
  herd = {{a, Cow(name("clover")), nullptr}};
"#,
            format!("construe REPL v{}", VERSION).bold(),
            "Commands:".yellow().bold(),
            "Examples:".yellow().bold()
        )
    }

    /// A statement is complete once delimiters balance and the last
    /// non-whitespace character is `;`.
    fn is_incomplete(&self, input: &str) -> bool {
        let mut paren_depth = 0i32;
        let mut brace_depth = 0i32;
        let mut in_string = false;
        let mut escape_next = false;
        let mut last_significant = ' ';

        let mut chars = input.chars().peekable();
        while let Some(c) = chars.next() {
            if escape_next {
                escape_next = false;
                continue;
            }
            match c {
                '\\' if in_string => escape_next = true,
                '"' => {
                    in_string = !in_string;
                    last_significant = c;
                }
                '/' if !in_string && chars.peek() == Some(&'/') => {
                    // Comment runs to end of line.
                    for rest in chars.by_ref() {
                        if rest == '\n' {
                            break;
                        }
                    }
                }
                '(' if !in_string => {
                    paren_depth += 1;
                    last_significant = c;
                }
                ')' if !in_string => {
                    paren_depth -= 1;
                    last_significant = c;
                }
                '{' if !in_string => {
                    brace_depth += 1;
                    last_significant = c;
                }
                '}' if !in_string => {
                    brace_depth -= 1;
                    last_significant = c;
                }
                _ => {
                    if !c.is_whitespace() {
                        last_significant = c;
                    }
                }
            }
        }

        paren_depth > 0 || brace_depth > 0 || in_string || last_significant != ';'
    }

    fn print_welcome(&self) {
        println!("{}", format!("construe v{}", VERSION).cyan());
        println!(
            "Type {} for help, {} to exit.\n",
            ":help".yellow(),
            ":quit".yellow()
        );
    }

    pub fn run(&mut self) {
        let mut rl = match DefaultEditor::new() {
            Ok(editor) => editor,
            Err(err) => {
                eprintln!("{}: {}", "Failed to start line editor".red(), err);
                return;
            }
        };
        let _ = rl.load_history(HISTORY_FILE);

        self.print_welcome();

        let mut input_buffer = String::new();

        'repl_loop: loop {
            let prompt = if input_buffer.is_empty() {
                "construe> ".to_string()
            } else {
                format!("{} ", "........".dimmed())
            };

            match rl.readline(&prompt) {
                Ok(line) => {
                    if input_buffer.is_empty() && line.trim().starts_with(':') {
                        let _ = rl.add_history_entry(line.as_str());
                        if let Some(result) = self.handle_command(&line) {
                            match result {
                                CommandResult::Print(msg) => println!("{}", msg),
                                CommandResult::Clear => {
                                    print!("\x1B[2J\x1B[1;1H");
                                    self.print_welcome();
                                }
                                CommandResult::Quit => break 'repl_loop,
                            }
                        } else {
                            eprintln!(
                                "{}: unknown command; try :help",
                                "Error".red().bold()
                            );
                        }
                        continue 'repl_loop;
                    }

                    if !input_buffer.is_empty() {
                        input_buffer.push('\n');
                    }
                    input_buffer.push_str(&line);

                    if input_buffer.trim().is_empty() {
                        input_buffer.clear();
                        continue 'repl_loop;
                    }
                    if self.is_incomplete(&input_buffer) {
                        continue 'repl_loop;
                    }

                    let _ = rl.add_history_entry(input_buffer.as_str());
                    let _ = rl.save_history(HISTORY_FILE);

                    match self.interp.eval_source(&input_buffer, Source::Repl) {
                        Ok(()) => println!("{}", "ok".dimmed()),
                        Err(e) => eprintln!("{}", e.format().red()),
                    }

                    input_buffer.clear();
                }
                Err(ReadlineError::Interrupted) => {
                    if !input_buffer.is_empty() {
                        println!("{}", "Input cancelled".dimmed());
                        input_buffer.clear();
                    }
                    continue 'repl_loop;
                }
                Err(ReadlineError::Eof) => break 'repl_loop,
                Err(err) => {
                    eprintln!("{}: {}", "Error".red(), err);
                    break 'repl_loop;
                }
            }
        }
    }
}
