// Line-oriented terminal front-end. Input lines come from a stdin thread through a
// channel shared by the command loop and by questions asked from game threads.

use std::io::{self, BufRead};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use console::Style;
use netchess::coord::{BOARD_SIZE, Point};
use netchess::force::Force;
use netchess::piece::{PieceKind, piece_to_pictogram};
use netchess::view::ChessView;


const POLL_INTERVAL: Duration = Duration::from_millis(50);

type Squares = [[Option<(PieceKind, Force)>; BOARD_SIZE as usize]; BOARD_SIZE as usize];

pub struct ConsoleView {
    squares: Mutex<Squares>,
    board_changed: AtomicBool,
    lines: Mutex<Receiver<String>>,
    asking: AtomicBool,
}

fn format_square(ch: char) -> String { format!(" {ch} ") }

fn render_squares(squares: &Squares) -> String {
    let colors = [
        Style::new().color256(233).on_color256(222),
        Style::new().color256(233).on_color256(230),
    ];
    let mut ret = String::new();
    for y in (0..BOARD_SIZE).rev() {
        ret.push_str(&format_square(char::from(b'1' + y as u8)));
        for x in 0..BOARD_SIZE {
            let ch = match squares[x as usize][y as usize] {
                Some((kind, force)) => piece_to_pictogram(kind, force),
                None => ' ',
            };
            let color = if Point::new(x, y).is_dark() { &colors[0] } else { &colors[1] };
            ret.push_str(&color.apply_to(format_square(ch)).to_string());
        }
        ret.push('\n');
    }
    ret.push_str(&format_square(' '));
    for x in 0..BOARD_SIZE {
        ret.push_str(&format_square(char::from(b'a' + x as u8)));
    }
    ret
}

// Accepts either the option label (case-insensitive) or its 1-based number.
fn match_option(answer: &str, options: &[String]) -> Option<String> {
    let answer = answer.trim();
    if let Ok(index) = answer.parse::<usize>() {
        return options.get(index.checked_sub(1)?).cloned();
    }
    options.iter().find(|option| option.eq_ignore_ascii_case(answer)).cloned()
}

impl ConsoleView {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
        ConsoleView {
            squares: Mutex::new([[None; BOARD_SIZE as usize]; BOARD_SIZE as usize]),
            board_changed: AtomicBool::new(false),
            lines: Mutex::new(rx),
            asking: AtomicBool::new(false),
        }
    }

    // Next command line, or `None` once stdin is closed. Lines typed while a question is
    // pending go to the question.
    pub fn next_command(&self) -> Option<String> {
        loop {
            if self.asking.load(Ordering::SeqCst) {
                thread::sleep(POLL_INTERVAL);
                continue;
            }
            match self.lines.lock().unwrap().recv_timeout(POLL_INTERVAL) {
                Ok(line) => return Some(line),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }

    pub fn print_board(&self) {
        let board = render_squares(&self.squares.lock().unwrap());
        self.board_changed.store(false, Ordering::SeqCst);
        println!("\n{board}\n");
    }

    fn set_square(&self, x: i8, y: i8, value: Option<(PieceKind, Force)>) {
        if !Point::new(x, y).is_in_board() {
            return;
        }
        self.squares.lock().unwrap()[x as usize][y as usize] = value;
        self.board_changed.store(true, Ordering::SeqCst);
    }
}

impl ChessView for ConsoleView {
    fn put_piece(&self, kind: PieceKind, force: Force, x: i8, y: i8) {
        self.set_square(x, y, Some((kind, force)));
    }

    fn remove_piece(&self, x: i8, y: i8) { self.set_square(x, y, None); }

    fn display_message(&self, text: &str) {
        if self.board_changed.load(Ordering::SeqCst) {
            self.print_board();
        }
        println!("{}", Style::new().bold().apply_to(text));
    }

    fn ask_user(&self, header: &str, question: &str, options: &[String]) -> String {
        self.asking.store(true, Ordering::SeqCst);
        let _asking = scopeguard::guard((), |_| self.asking.store(false, Ordering::SeqCst));
        let numbered: Vec<String> =
            options.iter().enumerate().map(|(i, option)| format!("{}) {option}", i + 1)).collect();
        println!("== {header} ==\n{question}\n{}", numbered.join("  "));
        let lines = self.lines.lock().unwrap();
        loop {
            let Ok(line) = lines.recv() else {
                // Stdin is gone; nobody can answer.
                return options[0].clone();
            };
            match match_option(&line, options) {
                Some(option) => return option,
                None => println!("Please answer with one of: {}", options.join(", ")),
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_matching() {
        let options = vec!["Yes".to_owned(), "No".to_owned()];
        assert_eq!(match_option("yes", &options), Some("Yes".to_owned()));
        assert_eq!(match_option(" 2 ", &options), Some("No".to_owned()));
        assert_eq!(match_option("0", &options), None);
        assert_eq!(match_option("3", &options), None);
        assert_eq!(match_option("maybe", &options), None);
    }

    #[test]
    fn board_text() {
        let mut squares: Squares = [[None; 8]; 8];
        squares[4][0] = Some((PieceKind::King, Force::White));
        let text = render_squares(&squares);
        assert!(text.contains('♔'));
        assert!(text.ends_with(" a  b  c  d  e  f  g  h "));
    }
}
