use crate::bits::Position;
use crate::game::Direction;

/// Clockwise rotation applied when mapping internal coordinates to the
/// externally displayed/serialized ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirror {
    None,
    Horizontal,
}

/// A pure internal<->external coordinate mapping. Used only at level ingest
/// and solution/board emit; the search itself works exclusively in internal
/// coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transform {
    pub rotation: Rotation,
    pub mirror: Mirror,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            rotation: Rotation::Deg0,
            mirror: Mirror::None,
        }
    }
}

impl Transform {
    /// Dimensions of the externally displayed board given the internal
    /// board's dimensions.
    pub fn external_dims(&self, width: u8, height: u8) -> (u8, u8) {
        match self.rotation {
            Rotation::Deg0 | Rotation::Deg180 => (width, height),
            Rotation::Deg90 | Rotation::Deg270 => (height, width),
        }
    }

    pub fn internal_to_external(&self, pos: Position, width: u8, height: u8) -> Position {
        let Position(x, y) = pos;
        let (rx, ry) = match self.rotation {
            Rotation::Deg0 => (x, y),
            Rotation::Deg90 => (height - 1 - y, x),
            Rotation::Deg180 => (width - 1 - x, height - 1 - y),
            Rotation::Deg270 => (y, width - 1 - x),
        };
        let (ext_width, _) = self.external_dims(width, height);
        match self.mirror {
            Mirror::None => Position(rx, ry),
            Mirror::Horizontal => Position(ext_width - 1 - rx, ry),
        }
    }

    pub fn external_to_internal(&self, pos: Position, width: u8, height: u8) -> Position {
        let (ext_width, _) = self.external_dims(width, height);
        let Position(ex, ey) = pos;
        let (rx, ry) = match self.mirror {
            Mirror::None => (ex, ey),
            Mirror::Horizontal => (ext_width - 1 - ex, ey),
        };
        match self.rotation {
            Rotation::Deg0 => Position(rx, ry),
            Rotation::Deg90 => Position(ry, height - 1 - rx),
            Rotation::Deg180 => Position(width - 1 - rx, height - 1 - ry),
            Rotation::Deg270 => Position(width - 1 - ry, rx),
        }
    }

    fn rotate_direction(&self, dir: Direction) -> Direction {
        match (self.rotation, dir) {
            (Rotation::Deg0, d) => d,
            (Rotation::Deg90, Direction::Up) => Direction::Right,
            (Rotation::Deg90, Direction::Down) => Direction::Left,
            (Rotation::Deg90, Direction::Left) => Direction::Up,
            (Rotation::Deg90, Direction::Right) => Direction::Down,
            (Rotation::Deg180, Direction::Up) => Direction::Down,
            (Rotation::Deg180, Direction::Down) => Direction::Up,
            (Rotation::Deg180, Direction::Left) => Direction::Right,
            (Rotation::Deg180, Direction::Right) => Direction::Left,
            (Rotation::Deg270, Direction::Up) => Direction::Left,
            (Rotation::Deg270, Direction::Down) => Direction::Right,
            (Rotation::Deg270, Direction::Left) => Direction::Down,
            (Rotation::Deg270, Direction::Right) => Direction::Up,
        }
    }

    fn mirror_direction(dir: Direction) -> Direction {
        match dir {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            d => d,
        }
    }

    /// `DirectionIntExt[rotation][mirror][dir]`: maps an internal direction
    /// to the direction it appears as on the external/displayed board.
    pub fn external_direction(&self, dir: Direction) -> Direction {
        let rotated = self.rotate_direction(dir);
        match self.mirror {
            Mirror::None => rotated,
            Mirror::Horizontal => Self::mirror_direction(rotated),
        }
    }

    /// Inverse of `external_direction`.
    pub fn internal_direction(&self, dir: Direction) -> Direction {
        crate::game::ALL_DIRECTIONS
            .into_iter()
            .find(|&d| self.external_direction(d) == dir)
            .expect("direction mapping is a bijection over the four cardinal directions")
    }
}

pub(crate) fn decode_lurd_char(c: char) -> Option<(Direction, bool)> {
    match c {
        'u' => Some((Direction::Up, false)),
        'U' => Some((Direction::Up, true)),
        'd' => Some((Direction::Down, false)),
        'D' => Some((Direction::Down, true)),
        'l' => Some((Direction::Left, false)),
        'L' => Some((Direction::Left, true)),
        'r' => Some((Direction::Right, false)),
        'R' => Some((Direction::Right, true)),
        _ => None,
    }
}

pub(crate) fn encode_lurd_char(dir: Direction, is_push: bool) -> char {
    let c = match dir {
        Direction::Up => 'u',
        Direction::Down => 'd',
        Direction::Left => 'l',
        Direction::Right => 'r',
    };
    if is_push { c.to_ascii_uppercase() } else { c }
}

/// Translates a LURD string from internal to external direction codes, or
/// vice versa. Whitespace is skipped; the first character that doesn't
/// decode as a LURD move terminates translation and the partial result
/// (accumulated so far) is returned, per the lenient-input design.
fn translate_lurd(lurd: &str, mut map: impl FnMut(Direction) -> Direction) -> String {
    let mut out = String::with_capacity(lurd.len());
    for c in lurd.chars() {
        if c.is_whitespace() {
            continue;
        }
        let Some((dir, is_push)) = decode_lurd_char(c) else {
            break;
        };
        out.push(encode_lurd_char(map(dir), is_push));
    }
    out
}

pub fn internal_to_external_lurd(transform: &Transform, lurd: &str) -> String {
    translate_lurd(lurd, |d| transform.external_direction(d))
}

pub fn external_to_internal_lurd(transform: &Transform, lurd: &str) -> String {
    translate_lurd(lurd, |d| transform.internal_direction(d))
}

/// Parses the optional `View: Rotated {0|90|180|270} degrees clockwise[,
/// flipped horizontally].` preamble line with a strict, line-anchored
/// grammar rather than substring search, so "0" never spuriously matches
/// inside "180"/"270" (see design notes on this ambiguity).
pub fn parse_preamble(line: &str) -> Option<Transform> {
    let line = line.trim();
    let rest = line.strip_prefix("View: Rotated ")?;

    let (rotation, rest) = if let Some(rest) = rest.strip_prefix("0 ") {
        (Rotation::Deg0, rest)
    } else if let Some(rest) = rest.strip_prefix("90 ") {
        (Rotation::Deg90, rest)
    } else if let Some(rest) = rest.strip_prefix("180 ") {
        (Rotation::Deg180, rest)
    } else if let Some(rest) = rest.strip_prefix("270 ") {
        (Rotation::Deg270, rest)
    } else {
        return None;
    };

    let rest = rest.strip_prefix("degrees clockwise")?;

    let (mirror, rest) = if let Some(rest) = rest.strip_prefix(", flipped horizontally") {
        (Mirror::Horizontal, rest)
    } else {
        (Mirror::None, rest)
    };

    if rest != "." {
        return None;
    }

    Some(Transform { rotation, mirror })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_preamble_identity() {
        let t = parse_preamble("View: Rotated 0 degrees clockwise.").unwrap();
        assert_eq!(t.rotation, Rotation::Deg0);
        assert_eq!(t.mirror, Mirror::None);
    }

    #[test]
    fn test_parse_preamble_rotated_mirrored() {
        let t = parse_preamble("View: Rotated 180 degrees clockwise, flipped horizontally.").unwrap();
        assert_eq!(t.rotation, Rotation::Deg180);
        assert_eq!(t.mirror, Mirror::Horizontal);
    }

    #[test]
    fn test_parse_preamble_rejects_garbage() {
        assert!(parse_preamble("not a preamble line").is_none());
        assert!(parse_preamble("View: Rotated 45 degrees clockwise.").is_none());
    }

    #[test]
    fn test_direction_table_matches_spec() {
        let cases = [
            (Rotation::Deg0, Mirror::None, [
                Direction::Up, Direction::Down, Direction::Left, Direction::Right,
            ]),
            (Rotation::Deg0, Mirror::Horizontal, [
                Direction::Up, Direction::Down, Direction::Right, Direction::Left,
            ]),
            (Rotation::Deg90, Mirror::None, [
                Direction::Right, Direction::Left, Direction::Up, Direction::Down,
            ]),
            (Rotation::Deg90, Mirror::Horizontal, [
                Direction::Left, Direction::Right, Direction::Up, Direction::Down,
            ]),
            (Rotation::Deg180, Mirror::None, [
                Direction::Down, Direction::Up, Direction::Right, Direction::Left,
            ]),
            (Rotation::Deg180, Mirror::Horizontal, [
                Direction::Down, Direction::Up, Direction::Left, Direction::Right,
            ]),
            (Rotation::Deg270, Mirror::None, [
                Direction::Left, Direction::Right, Direction::Down, Direction::Up,
            ]),
            (Rotation::Deg270, Mirror::Horizontal, [
                Direction::Right, Direction::Left, Direction::Down, Direction::Up,
            ]),
        ];

        for (rotation, mirror, expected) in cases {
            let transform = Transform { rotation, mirror };
            let internal = [
                Direction::Up,
                Direction::Down,
                Direction::Left,
                Direction::Right,
            ];
            for (dir, expected_dir) in internal.iter().zip(expected.iter()) {
                assert_eq!(transform.external_direction(*dir), *expected_dir);
            }
        }
    }

    #[test]
    fn test_position_round_trip_all_transforms() {
        let width = 6u8;
        let height = 4u8;
        for rotation in [
            Rotation::Deg0,
            Rotation::Deg90,
            Rotation::Deg180,
            Rotation::Deg270,
        ] {
            for mirror in [Mirror::None, Mirror::Horizontal] {
                let transform = Transform { rotation, mirror };
                for y in 0..height {
                    for x in 0..width {
                        let pos = Position(x, y);
                        let ext = transform.internal_to_external(pos, width, height);
                        let (ew, eh) = transform.external_dims(width, height);
                        assert!(ext.0 < ew && ext.1 < eh);
                        let back = transform.external_to_internal(ext, width, height);
                        assert_eq!(back, pos);
                    }
                }
            }
        }
    }

    #[test]
    fn test_lurd_round_trip() {
        let transform = Transform {
            rotation: Rotation::Deg90,
            mirror: Mirror::Horizontal,
        };
        let lurd = "uDLr";
        let external = internal_to_external_lurd(&transform, lurd);
        let back = external_to_internal_lurd(&transform, &external);
        assert_eq!(back, lurd);
    }

    #[test]
    fn test_lurd_lenient_termination() {
        let transform = Transform::default();
        let result = internal_to_external_lurd(&transform, "ud!rd");
        assert_eq!(result, "ud");
    }
}
