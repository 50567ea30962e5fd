/// Logical keys a frontend can report, independent of the windowing
/// library's own keycode type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    A,
    B,
    S,
    X,
    Z,
    Return,
    Backspace,
    Escape,
    None,
}
