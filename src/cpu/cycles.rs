/*!
cycles.rs - Per-opcode base cycle cost table.

Overview
========
`base_cycles` is a direct transcription of `OPCODES_CYCLES[256]` from
the original interpreter (`libi8080/src/i8080.c`). It gives the cycle
cost an instruction takes when its conditional branch (if any) is NOT
taken; `is_conditional_branch`/`taken_branch_bonus` add the extra cost
for the eight conditional CALL opcodes and eight conditional RET
opcodes when the condition evaluates true, per spec.md §4.3.
*/

/// Base cycle cost of `op`, as if any conditional branch it carries is
/// not taken.
pub fn base_cycles(op: u8) -> u32 {
    const TABLE: [u32; 256] = [
        // 0x00..=0x0F
        4, 10, 7, 5, 5, 5, 7, 4, 4, 10, 7, 5, 5, 5, 7, 4, // 0x10..=0x1F
        4, 10, 7, 5, 5, 5, 7, 4, 4, 10, 7, 5, 5, 5, 7, 4, // 0x20..=0x2F
        4, 10, 16, 5, 5, 5, 7, 4, 4, 10, 16, 5, 5, 5, 7, 4, // 0x30..=0x3F
        4, 10, 13, 5, 10, 10, 10, 4, 4, 10, 13, 5, 5, 5, 7, 4, // 0x40..=0x4F
        5, 5, 5, 5, 5, 5, 7, 5, 5, 5, 5, 5, 5, 5, 7, 5, // 0x50..=0x5F
        5, 5, 5, 5, 5, 5, 7, 5, 5, 5, 5, 5, 5, 5, 7, 5, // 0x60..=0x6F
        5, 5, 5, 5, 5, 5, 7, 5, 5, 5, 5, 5, 5, 5, 7, 5, // 0x70..=0x7F
        7, 7, 7, 7, 7, 7, 7, 7, 5, 5, 5, 5, 5, 5, 7, 5, // 0x80..=0x8F
        4, 4, 4, 4, 4, 4, 7, 4, 4, 4, 4, 4, 4, 4, 7, 4, // 0x90..=0x9F
        4, 4, 4, 4, 4, 4, 7, 4, 4, 4, 4, 4, 4, 4, 7, 4, // 0xA0..=0xAF
        4, 4, 4, 4, 4, 4, 7, 4, 4, 4, 4, 4, 4, 4, 7, 4, // 0xB0..=0xBF
        4, 4, 4, 4, 4, 4, 7, 4, 4, 4, 4, 4, 4, 4, 7, 4, // 0xC0..=0xCF
        5, 10, 10, 10, 11, 11, 7, 11, 5, 10, 10, 10, 11, 17, 7, 11,
        // 0xD0..=0xDF
        5, 10, 10, 10, 11, 11, 7, 11, 5, 10, 10, 10, 11, 17, 7, 11,
        // 0xE0..=0xEF
        5, 10, 10, 18, 11, 11, 7, 11, 5, 5, 10, 5, 11, 17, 7, 11,
        // 0xF0..=0xFF
        5, 10, 10, 4, 11, 11, 7, 11, 5, 5, 10, 4, 11, 17, 7, 11,
    ];
    TABLE[op as usize]
}

/// True if `op` is a conditional CALL or RET, i.e. one whose cost rises
/// by 6 cycles when its condition evaluates true.
pub fn is_conditional_branch(op: u8) -> bool {
    matches!(
        op,
        0xC0 | 0xC8
            | 0xD0
            | 0xD8
            | 0xE0
            | 0xE8
            | 0xF0
            | 0xF8
            | 0xC4
            | 0xCC
            | 0xD4
            | 0xDC
            | 0xE4
            | 0xEC
            | 0xF4
            | 0xFC
    )
}

/// Extra cycles charged when a conditional CALL/RET's condition is
/// true. Zero for any opcode `is_conditional_branch` reports false for.
pub fn taken_branch_bonus(op: u8) -> u32 {
    if is_conditional_branch(op) {
        6
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nop_costs_four() {
        assert_eq!(base_cycles(0x00), 4);
    }

    #[test]
    fn hlt_costs_seven() {
        assert_eq!(base_cycles(0x76), 7);
    }

    #[test]
    fn unconditional_call_costs_seventeen_with_no_bonus() {
        assert_eq!(base_cycles(0xCD), 17);
        assert_eq!(taken_branch_bonus(0xCD), 0);
    }

    #[test]
    fn conditional_call_bonus_brings_total_to_seventeen() {
        // CNZ base 11 + 6 taken-bonus == 17, matching unconditional CALL.
        assert_eq!(base_cycles(0xC4), 11);
        assert_eq!(taken_branch_bonus(0xC4), 6);
        assert_eq!(base_cycles(0xC4) + taken_branch_bonus(0xC4), 17);
    }

    #[test]
    fn conditional_ret_bonus_brings_total_to_eleven() {
        assert_eq!(base_cycles(0xC0), 5);
        assert_eq!(taken_branch_bonus(0xC0), 6);
        assert_eq!(base_cycles(0xC0) + taken_branch_bonus(0xC0), 11);
    }

    #[test]
    fn unconditional_ret_has_no_bonus() {
        assert_eq!(base_cycles(0xC9), 10);
        assert_eq!(taken_branch_bonus(0xC9), 0);
    }

    #[test]
    fn every_opcode_cost_is_within_documented_bounds() {
        for op in 0u16..=255 {
            let cost = base_cycles(op as u8) + taken_branch_bonus(op as u8);
            assert!(cost >= 4, "op {op:#04x} cost {cost} below minimum");
            assert!(cost <= 18, "op {op:#04x} cost {cost} above maximum");
        }
    }
}
