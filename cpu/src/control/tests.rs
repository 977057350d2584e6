//! Whole-machine tests: short programs deposited into memory and run
//! to a stop condition.  Words are assembled by hand with [`inst`];
//! everything else goes through the public examine/deposit/run
//! surface, except where a test reaches into the interrupt system to
//! stand in for a device.
use super::*;

use crate::flags;
use crate::memory::MemoryConfiguration;
use crate::stop::StopReason;

use base::prelude::*;

/// Assemble an instruction word from opcode, AC field and address.
fn inst(opcode: u64, ac: u64, y: u64) -> u64 {
    (opcode << 27) | ((ac & 0o17) << 23) | (y & RMASK)
}

/// The same with the indirect bit on.
fn inst_i(opcode: u64, ac: u64, y: u64) -> u64 {
    inst(opcode, ac, y) | IND_BIT
}

fn halt() -> u64 {
    inst(0o254, 0o4, 0)
}

fn ka() -> Machine {
    Machine::new(&MachineConfig::default()).expect("default config is valid")
}

fn ki() -> Machine {
    Machine::new(&MachineConfig {
        model: CpuModel::Ki,
        memory: MemoryConfiguration { k_words: 64 },
        history_size: 0,
        two_segment: false,
    })
    .expect("64K KI10 is valid")
}

fn load(m: &mut Machine, image: &[(u64, u64)]) {
    for (addr, word) in image {
        m.deposit(*addr, *word).expect("test image in range");
    }
}

fn run_from(m: &mut Machine, start: u64, max_steps: u64) -> StopReason {
    m.set_pc(start);
    m.run(max_steps)
}

#[test]
fn test_rejected_memory_sizes() {
    for k_words in [0, 8, 24, 4097] {
        let r = Machine::new(&MachineConfig {
            model: CpuModel::Ki,
            memory: MemoryConfiguration { k_words },
            history_size: 0,
            two_segment: false,
        });
        assert!(r.is_err(), "{k_words}K should be refused");
    }
}

// MOVEI 1,5 / ADD 2,1 / MOVEM 2,100 / HALT: the whole fetch,
// operand, execute, store sequence on the simplest possible program.
#[test]
fn test_load_add_store_halt() {
    let mut m = ka();
    m.deposit(2, 0o30).expect("AC2");
    load(
        &mut m,
        &[
            (0o1000, inst(0o201, 1, 5)),
            (0o1001, inst(0o270, 2, 1)),
            (0o1002, inst(0o202, 2, 0o100)),
            (0o1003, halt()),
        ],
    );
    assert_eq!(run_from(&mut m, 0o1000, 10), StopReason::Halted { at: 0o1003 });
    assert_eq!(m.examine(1), Ok(5));
    assert_eq!(m.examine(2), Ok(0o35));
    assert_eq!(m.examine(0o100), Ok(0o35));
}

#[test]
fn test_step_limit() {
    let mut m = ka();
    load(&mut m, &[(0o1000, inst(0o254, 0, 0o1000))]);
    assert_eq!(
        run_from(&mut m, 0o1000, 25),
        StopReason::StepLimit { steps: 25 }
    );
}

#[test]
fn test_breakpoint_stops_before_execution_and_resumes() {
    let mut m = ka();
    load(
        &mut m,
        &[
            (0o1000, inst(0o201, 1, 5)),
            (0o1001, inst(0o201, 2, 6)),
            (0o1002, halt()),
        ],
    );
    m.set_breakpoint(Some(0o1001));
    assert_eq!(
        run_from(&mut m, 0o1000, 10),
        StopReason::Breakpoint { at: 0o1001 }
    );
    assert_eq!(m.examine(1), Ok(5));
    assert_eq!(m.examine(2), Ok(0));
    // Resuming executes the instruction under the breakpoint.
    assert_eq!(m.run(10), StopReason::Halted { at: 0o1002 });
    assert_eq!(m.examine(2), Ok(6));
}

// The carry pair: overflow is flagged exactly when the carries into
// and out of the sign disagree.
#[test]
fn test_add_overflow_positive_wrap() {
    let mut m = ka();
    m.deposit(1, CMASK).expect("AC1 = largest positive");
    load(&mut m, &[(0o1000, inst(0o271, 1, 1)), (0o1001, halt())]);
    run_from(&mut m, 0o1000, 10);
    assert_eq!(m.examine(1), Ok(SMASK));
    assert!(m.flags().overflow());
    assert!(m.flags().carry1());
    assert!(!m.flags().carry0());
}

#[test]
fn test_add_overflow_two_largest_negatives() {
    let mut m = ka();
    m.deposit(1, SMASK).expect("AC1");
    m.deposit(0o200, SMASK).expect("operand");
    load(&mut m, &[(0o1000, inst(0o270, 1, 0o200)), (0o1001, halt())]);
    run_from(&mut m, 0o1000, 10);
    assert_eq!(m.examine(1), Ok(0));
    assert!(m.flags().overflow());
    assert!(!m.flags().carry1());
    assert!(m.flags().carry0());
}

#[test]
fn test_add_benign_wrap_is_not_overflow() {
    let mut m = ka();
    m.deposit(1, FMASK).expect("AC1 = -1");
    load(&mut m, &[(0o1000, inst(0o271, 1, 1)), (0o1001, halt())]);
    run_from(&mut m, 0o1000, 10);
    assert_eq!(m.examine(1), Ok(0));
    assert!(!m.flags().overflow());
    assert!(m.flags().carry0());
    assert!(m.flags().carry1());
}

#[test]
fn test_boolean_and_halfword() {
    let mut m = ka();
    load(
        &mut m,
        &[
            (0o1000, inst(0o201, 1, 0o707)), // MOVEI 1,707
            (0o1001, inst(0o431, 1, 0o777)), // XORI 1,777
            (0o1002, inst(0o514, 2, 1)),     // HRLZ 2,1
            (0o1003, halt()),
        ],
    );
    run_from(&mut m, 0o1000, 10);
    assert_eq!(m.examine(1), Ok(0o070));
    assert_eq!(m.examine(2), Ok(0o070 << 18));
}

#[test]
fn test_test_class_modifies_and_skips() {
    let mut m = ka();
    load(
        &mut m,
        &[
            (0o1000, inst(0o201, 1, 0o777)), // MOVEI 1,777
            (0o1001, inst(0o622, 1, 0o070)), // TRZE 1,70: bits set, no skip
            (0o1002, halt()),
            (0o1003, halt()),
        ],
    );
    assert_eq!(run_from(&mut m, 0o1000, 10), StopReason::Halted { at: 0o1002 });
    assert_eq!(m.examine(1), Ok(0o707));
}

#[test]
fn test_compare_skip() {
    let mut m = ka();
    load(
        &mut m,
        &[
            (0o1000, inst(0o201, 1, 5)),     // MOVEI 1,5
            (0o1001, inst(0o302, 1, 5)),     // CAIE 1,5: skips
            (0o1002, inst(0o254, 0, 0o1004)),
            (0o1003, halt()),
            (0o1004, halt()),
        ],
    );
    assert_eq!(run_from(&mut m, 0o1000, 10), StopReason::Halted { at: 0o1003 });
}

#[test]
fn test_aobjn_counts_out() {
    let mut m = ka();
    m.deposit(1, join(0o777776, 0)).expect("AC1 = -2 count");
    load(
        &mut m,
        &[(0o1000, inst(0o253, 1, 0o1000)), (0o1001, halt())],
    );
    assert_eq!(run_from(&mut m, 0o1000, 10), StopReason::Halted { at: 0o1001 });
    assert_eq!(m.examine(1), Ok(join(0, 2)));
}

#[test]
fn test_shifts() {
    let mut m = ka();
    load(
        &mut m,
        &[
            (0o1000, inst(0o201, 1, 1)),            // MOVEI 1,1
            (0o1001, inst(0o242, 1, 3)),            // LSH 1,3
            (0o1002, inst(0o242, 1, 0o777776)),     // LSH 1,-2
            (0o1003, halt()),
        ],
    );
    run_from(&mut m, 0o1000, 10);
    assert_eq!(m.examine(1), Ok(2));
}

#[test]
fn test_jffo_finds_first_one() {
    let mut m = ka();
    load(
        &mut m,
        &[
            (0o1000, inst(0o201, 1, 1)),      // MOVEI 1,1
            (0o1001, inst(0o243, 1, 0o1003)), // JFFO 1,1003
            (0o1002, halt()),
            (0o1003, halt()),
        ],
    );
    assert_eq!(run_from(&mut m, 0o1000, 10), StopReason::Halted { at: 0o1003 });
    assert_eq!(m.examine(2), Ok(35));
}

#[test]
fn test_multiply_and_divide() {
    let mut m = ka();
    load(
        &mut m,
        &[
            (0o1000, inst(0o201, 1, 6)), // MOVEI 1,6
            (0o1001, inst(0o221, 1, 7)), // IMULI 1,7
            (0o1002, inst(0o231, 1, 5)), // IDIVI 1,5
            (0o1003, halt()),
        ],
    );
    run_from(&mut m, 0o1000, 10);
    assert_eq!(m.examine(1), Ok(8));
    assert_eq!(m.examine(2), Ok(2));
    assert!(!m.flags().overflow());
    assert!(!m.flags().no_divide());
}

#[test]
fn test_divide_by_zero_suppresses_store() {
    let mut m = ka();
    m.deposit(1, 0o52).expect("AC1");
    load(&mut m, &[(0o1000, inst(0o231, 1, 0)), (0o1001, halt())]);
    run_from(&mut m, 0o1000, 10);
    // The quotient store is inhibited; the no-divide and overflow
    // flags report the abandonment.
    assert_eq!(m.examine(1), Ok(0o52));
    assert!(m.flags().no_divide());
    assert!(m.flags().overflow());
}

#[test]
fn test_pushj_popj_round_trip() {
    let mut m = ka();
    m.deposit(0o17, join(0o777000, 0o500)).expect("stack pointer");
    load(
        &mut m,
        &[
            (0o1000, inst(0o260, 0o17, 0o2000)), // PUSHJ 17,2000
            (0o1001, halt()),
            (0o2000, inst(0o263, 0o17, 0)),      // POPJ 17,
        ],
    );
    assert_eq!(run_from(&mut m, 0o1000, 10), StopReason::Halted { at: 0o1001 });
    assert_eq!(m.examine(0o17), Ok(join(0o777000, 0o500)));
    let frame = m.examine(0o501).expect("stack frame");
    assert_eq!(frame & RMASK, 0o1001);
}

#[test]
fn test_push_overflow_sets_flag() {
    let mut m = ka();
    m.deposit(0o17, join(0o777777, 0o500)).expect("pointer about to wrap");
    m.deposit(0o200, 0o42).expect("operand");
    load(
        &mut m,
        &[(0o1000, inst(0o261, 0o17, 0o200)), (0o1001, halt())],
    );
    run_from(&mut m, 0o1000, 10);
    assert!(m.push_ovf);
    assert_eq!(m.examine(0o501), Ok(0o42));
}

#[test]
fn test_blt_copies_block() {
    let mut m = ka();
    m.deposit(1, join(0o200, 0o300)).expect("source,,destination");
    load(
        &mut m,
        &[
            (0o200, 0o111),
            (0o201, 0o222),
            (0o202, 0o333),
            (0o1000, inst(0o251, 1, 0o302)), // BLT 1,302
            (0o1001, halt()),
        ],
    );
    assert_eq!(run_from(&mut m, 0o1000, 10), StopReason::Halted { at: 0o1001 });
    assert_eq!(m.examine(0o300), Ok(0o111));
    assert_eq!(m.examine(0o301), Ok(0o222));
    assert_eq!(m.examine(0o302), Ok(0o333));
}

#[test]
fn test_xct_executes_out_of_line() {
    let mut m = ka();
    load(
        &mut m,
        &[
            (0o200, inst(0o201, 1, 7)),      // MOVEI 1,7
            (0o1000, inst(0o256, 0, 0o200)), // XCT 200
            (0o1001, halt()),
        ],
    );
    assert_eq!(run_from(&mut m, 0o1000, 10), StopReason::Halted { at: 0o1001 });
    assert_eq!(m.examine(1), Ok(7));
}

#[test]
fn test_ldb_extracts_byte() {
    let mut m = ka();
    load(
        &mut m,
        &[
            // Byte pointer: position 6, size 6, address 300.
            (0o200, (6 << 30) | (6 << 24) | 0o300),
            (0o300, 0o7700),
            (0o1000, inst(0o135, 1, 0o200)), // LDB 1,200
            (0o1001, halt()),
        ],
    );
    assert_eq!(run_from(&mut m, 0o1000, 10), StopReason::Halted { at: 0o1001 });
    assert_eq!(m.examine(1), Ok(0o77));
}

#[test]
fn test_ibp_steps_to_next_word() {
    let mut m = ka();
    load(
        &mut m,
        &[
            // Position 0: no room left in this word for another
            // 6-bit byte.
            (0o200, (6 << 24) | 0o300),
            (0o1000, inst(0o133, 0, 0o200)), // IBP 200
            (0o1001, halt()),
        ],
    );
    run_from(&mut m, 0o1000, 10);
    assert_eq!(m.examine(0o200), Ok((30 << 30) | (6 << 24) | 0o301));
}

#[test]
fn test_local_uuo_traps_through_40() {
    let mut m = ka();
    load(
        &mut m,
        &[
            (0o41, halt()),
            (0o1000, inst(0o001, 0, 0)),
        ],
    );
    assert_eq!(run_from(&mut m, 0o1000, 10), StopReason::Halted { at: 0o41 });
    assert_eq!(m.examine(0o40), Ok(inst(0o001, 0, 0)));
}

#[test]
fn test_unassigned_opcode_traps_through_60() {
    let mut m = ka();
    load(
        &mut m,
        &[
            (0o61, halt()),
            (0o1000, inst(0o101, 2, 0o1234)),
        ],
    );
    assert_eq!(run_from(&mut m, 0o1000, 10), StopReason::Halted { at: 0o61 });
    assert_eq!(m.examine(0o60), Ok(inst(0o101, 2, 0o1234)));
}

#[test]
fn test_user_mode_halt_traps_instead_of_stopping() {
    let mut m = ka();
    load(
        &mut m,
        &[
            (0o41, halt()),
            (0o100, halt()),
        ],
    );
    m.flags.set_user();
    // The user program's HALT becomes a monitor trap; the monitor's
    // own HALT at 41 is what stops the machine.
    assert_eq!(run_from(&mut m, 0o100, 10), StopReason::Halted { at: 0o41 });
    assert_eq!(m.examine(0o40), Ok(inst(0o254, 0o4, 0)));
}

#[test]
fn test_ki_monitor_uuo_uses_process_table() {
    let mut m = ki();
    load(
        &mut m,
        &[
            (0o430, join(0, 0o3000)),
            (0o3000, halt()),
            (0o1000, inst(0o050, 3, 0o700)),
        ],
    );
    assert_eq!(run_from(&mut m, 0o1000, 10), StopReason::Halted { at: 0o3000 });
    assert_eq!(m.examine(0o424), Ok(inst(0o050, 3, 0o700)));
    let pc_word = m.examine(0o425).expect("saved PC word");
    assert_eq!(pc_word & RMASK, 0o1001);
}

#[test]
fn test_ki_dmove_loads_pair() {
    let mut m = ki();
    load(
        &mut m,
        &[
            (0o200, 0o123_456_000_000),
            (0o201, 0o000_000_654_321),
            (0o1000, inst(0o120, 2, 0o200)), // DMOVE 2,200
            (0o1001, halt()),
        ],
    );
    assert_eq!(run_from(&mut m, 0o1000, 10), StopReason::Halted { at: 0o1001 });
    assert_eq!(m.examine(2), Ok(0o123_456_000_000));
    assert_eq!(m.examine(3), Ok(0o000_000_654_321));
}

#[test]
fn test_floating_add_normalizes() {
    let mut m = ka();
    load(
        &mut m,
        &[
            (0o200, 0o201_600_000_000), // +1.5
            (0o201, 0o577_400_000_000), // -0.5
            (0o1000, inst(0o200, 1, 0o200)), // MOVE 1,200
            (0o1001, inst(0o140, 1, 0o201)), // FAD 1,201
            (0o1002, halt()),
        ],
    );
    run_from(&mut m, 0o1000, 10);
    // +1.0, normalized, no floating overflow or underflow.
    assert_eq!(m.examine(1), Ok(0o201_400_000_000));
    assert!(!m.flags().float_overflow());
    assert!(!m.flags().float_underflow());
}

#[test]
fn test_floating_add_zero_is_identity() {
    // Adding floating zero routes a normalized operand through the
    // whole align/normalize/pack path and must reproduce it exactly,
    // for either sign.
    for word in [0o201_600_000_000, 0o577_200_000_000] {
        let mut m = ka();
        load(
            &mut m,
            &[
                (0o200, word),
                (0o201, 0), // floating zero
                (0o1000, inst(0o200, 1, 0o200)), // MOVE 1,200
                (0o1001, inst(0o140, 1, 0o201)), // FAD 1,201
                (0o1002, halt()),
            ],
        );
        run_from(&mut m, 0o1000, 10);
        assert_eq!(m.examine(1), Ok(word));
        assert!(!m.flags().float_overflow());
        assert!(!m.flags().float_underflow());
    }
}

#[test]
fn test_floating_multiply_negative_result() {
    let mut m = ka();
    load(
        &mut m,
        &[
            (0o200, 0o201_600_000_000), // +1.5
            (0o201, 0o577_400_000_000), // -0.5
            (0o1000, inst(0o200, 1, 0o200)), // MOVE 1,200
            (0o1001, inst(0o160, 1, 0o201)), // FMP 1,201
            (0o1002, halt()),
        ],
    );
    run_from(&mut m, 0o1000, 10);
    // -0.75 in negative floating format.
    assert_eq!(m.examine(1), Ok(0o577_200_000_000));
    assert!(!m.flags().float_overflow());
    assert!(!m.flags().float_underflow());
}

#[test]
fn test_nxm_aborts_store_and_continues() {
    let mut m = Machine::new(&MachineConfig {
        memory: MemoryConfiguration { k_words: 16 },
        ..MachineConfig::default()
    })
    .expect("16K KA10 is valid");
    m.deposit(1, 0o42).expect("AC1");
    load(
        &mut m,
        &[
            (0o1000, inst(0o202, 1, 0o40_000)), // MOVEM 1,40000: off the end
            (0o1001, halt()),
        ],
    );
    // The store faults but the program carries on to its HALT.
    assert_eq!(run_from(&mut m, 0o1000, 10), StopReason::Halted { at: 0o1001 });
    assert!(m.nxm_flag);
}

#[test]
fn test_examine_deposit_bounds() {
    let mut m = Machine::new(&MachineConfig {
        memory: MemoryConfiguration { k_words: 16 },
        ..MachineConfig::default()
    })
    .expect("16K KA10 is valid");
    assert!(m.deposit(0o37_777, 1).is_ok());
    assert!(m.deposit(0o40_000, 1).is_err());
    assert!(m.examine(0o40_000).is_err());
    // Addresses below 020 are the accumulators.
    m.deposit(0o5, 0o77).expect("fast memory");
    assert_eq!(m.examine(0o5), Ok(0o77));
}

#[test]
fn test_simultaneous_requests_grant_highest_priority() {
    let mut m = ka();
    m.pi.cono(0o2_000 | 0o177);
    m.pi.cono(0o200);
    m.pi.set_interrupt(0o030, 3);
    m.pi.set_interrupt(0o034, 5);
    load(
        &mut m,
        &[
            (0o46, halt()), // level 3 vector
            (0o52, halt()), // level 5 vector
            (0o1000, inst(0o254, 0, 0o1000)),
        ],
    );
    // Level 3 wins; it is held and level 5 keeps waiting.
    assert_eq!(run_from(&mut m, 0o1000, 10), StopReason::Halted { at: 0o46 });
    assert_eq!(m.pi.enc, 3);
    assert_eq!(m.pi.pih, 0o200 >> 3);
    assert_eq!(m.pi.pir, 0o200 >> 5);
}

// A self-referencing indirect word spins in the effective address
// calculation until the interval clock breaks the chain.
#[test]
fn test_self_indirect_chain_broken_by_interrupt() {
    let mut m = ka();
    load(
        &mut m,
        &[
            (0o42, halt()), // level 1 vector
            (0o500, IND_BIT | 0o500),
            (0o1000, inst(0o700, 0o14, 0o2377)),  // CONO PI,2377
            (0o1001, inst(0o700, 0o4, 0o2_001)),  // CONO APR,2001: clock on, level 1
            (0o1002, inst_i(0o200, 1, 0o500)),    // MOVE 1,@500
        ],
    );
    assert_eq!(run_from(&mut m, 0o1000, 10), StopReason::Halted { at: 0o42 });
    assert!(m.clk_flg);
}

// Arithmetic overflow raises the APR interrupt; the handler returns
// with JEN, dismissing the hold and restoring the program's flags.
#[test]
fn test_overflow_interrupt_service_and_dismiss() {
    let mut m = ka();
    load(
        &mut m,
        &[
            (0o42, inst(0o264, 0, 0o3000)),       // JSR 3000
            (0o200, CMASK),                       // largest positive
            (0o1000, inst(0o700, 0o14, 0o2377)),  // CONO PI,2377
            (0o1001, inst(0o700, 0o4, 0o21)),     // CONO APR,21: OV on, level 1
            (0o1002, inst(0o200, 1, 0o200)),      // MOVE 1,200
            (0o1003, inst(0o271, 1, 1)),          // ADDI 1,1: overflows
            (0o1004, halt()),
            (0o3001, inst(0o700, 0o4, 0o40)),     // CONO APR,40: OV interrupt off
            (0o3002, inst_i(0o254, 0o12, 0o3000)), // JEN @3000
        ],
    );
    assert_eq!(run_from(&mut m, 0o1000, 20), StopReason::Halted { at: 0o1004 });
    // The handler saw the interrupted PC and the overflow flag.
    let saved = m.examine(0o3000).expect("JSR frame");
    assert_eq!(saved & RMASK, 0o1004);
    assert_ne!(saved & SMASK, 0); // OV lives in the stored sign bit
    // JEN dismissed the hold and JRSTF brought the flags back.
    assert_eq!(m.pi.pih, 0);
    assert!(m.flags().overflow());
}

#[test]
fn test_jrstf_restores_selected_flags() {
    let mut m = ka();
    load(
        &mut m,
        &[
            (0o200, (u64::from(flags::CRY1) << flags::WORD_SHIFT) | 0o2000),
            (0o1000, inst_i(0o254, 0o2, 0o200)), // JRSTF @200
            (0o2000, halt()),
        ],
    );
    assert_eq!(run_from(&mut m, 0o1000, 10), StopReason::Halted { at: 0o2000 });
    assert!(m.flags().carry1());
    assert!(!m.flags().overflow());
}

#[test]
fn test_history_records_each_instruction() {
    let mut m = Machine::new(&MachineConfig {
        history_size: 8,
        ..MachineConfig::default()
    })
    .expect("default KA10 with history");
    m.deposit(2, 0o30).expect("AC2");
    load(
        &mut m,
        &[
            (0o1000, inst(0o201, 1, 5)),
            (0o1001, inst(0o270, 2, 1)),
            (0o1002, inst(0o202, 2, 0o100)),
            (0o1003, halt()),
        ],
    );
    run_from(&mut m, 0o1000, 10);
    let pcs: Vec<u64> = m.history().iter().map(|e| e.pc).collect();
    assert_eq!(pcs, vec![0o1000, 0o1001, 0o1002, 0o1003]);
    let add = m.history().iter().nth(1).expect("ADD entry");
    assert_eq!(add.inst, inst(0o270, 2, 1));
    assert_eq!(add.result, 0o35);
}
