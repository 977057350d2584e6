//! The execution engine.
//!
//! One [`Machine`] owns the whole processor: fast memory, the
//! datapath registers, the flag word, the priority interrupt system,
//! the translation hardware for whichever model is configured, core
//! memory and the in-out bus.  Instruction flow follows the hardware
//! cycle structure: fetch, effective address calculation, operand
//! fetch per the opcode's profile, execution, then a store cycle
//! driven by the same profile.  Interrupt grants and traps splice
//! themselves into this flow by forcing a new fetch without
//! disturbing the program counter.
use tracing::{event, Level};

mod op_arith;
mod op_byte;
mod op_float;
mod op_half;
mod op_io;
mod op_jump;
mod op_logic;
mod op_move;
mod op_shift;
mod trap;
#[cfg(test)]
mod tests;

use base::instruction::IND_BIT;
use base::prelude::*;

use crate::bus::{DeviceBus, DeviceConflict, DeviceOutcome, IoDevice};
use crate::events::EventQueue;
use crate::flags::Flags;
use crate::history::{History, HistoryEntry};
use crate::memory::{MemoryConfiguration, MemoryUnit};
use crate::mmu::{BaseBounds, Pager};
use crate::pi::PiSystem;
use crate::stop::{ConfigError, StopReason};

/// Device code of the processor itself (error flags, clock control,
/// KA10 relocation load).
const APR: u64 = 0o000;
/// Device code of the priority interrupt system; the interval clock
/// interrupts on this code.
const PI: u64 = 0o004;
/// Device code of the KI10 pager.
const PAG: u64 = 0o010;

/// Interval clock rate and the resulting service period in ticks
/// (one tick per memory cycle, roughly a microsecond).
const CLOCK_HZ: u64 = 60;
const CLOCK_PERIOD: u64 = 1_000_000 / CLOCK_HZ;

// Operand profile bits, one word per opcode in OPFLAGS.  The operand
// cycle before dispatch and the store cycle after are driven
// entirely by these.
const FCE: u16 = 0o000_001; // Fetch memory into AR
const FCEPSE: u16 = 0o000_002; // Fetch memory into AR, store back after
const SCE: u16 = 0o000_004; // Save AR into memory
const FAC: u16 = 0o000_010; // Fetch AC into AR, old AR to BR
const FAC2: u16 = 0o000_020; // Fetch AC+1 into MQ
const SAC: u16 = 0o000_040; // Save AR into AC
const SACZ: u16 = 0o000_100; // Save AR into AC if AC not 0
const SAC2: u16 = 0o000_200; // Save MQ into AC+1
const SWAR: u16 = 0o001_000; // Swap AR halves
const FBR: u16 = 0o002_000; // Fetch AC into BR
const FMB: u16 = 0o004_000; // Fetch MB into BR

#[rustfmt::skip]
static OPFLAGS: [u16; 512] = [
    // 000-077: local and monitor programmed operators
    0, 0, 0, 0, 0, 0, 0, 0,                                     // 000
    0, 0, 0, 0, 0, 0, 0, 0,                                     // 010
    0, 0, 0, 0, 0, 0, 0, 0,                                     // 020
    0, 0, 0, 0, 0, 0, 0, 0,                                     // 030
    0, 0, 0, 0, 0, 0, 0, 0,                                     // 040
    0, 0, 0, 0, 0, 0, 0, 0,                                     // 050
    0, 0, 0, 0, 0, 0, 0, 0,                                     // 060
    0, 0, 0, 0, 0, 0, 0, 0,                                     // 070
    0, 0, 0, 0, 0, 0, 0, 0,                                     // 100
    // 110: DFAD DFSB DFMP DFDV (KI10)
    FCE|FAC|FAC2|SAC|SAC2, FCE|FAC|FAC2|SAC|SAC2,
    FCE|FAC|FAC2|SAC|SAC2, FCE|FAC|FAC2|SAC|SAC2, 0, 0, 0, 0,
    // 120: DMOVE DMOVN FIX EXTEND DMOVEM DMOVNM FIXR FLTR (KI10)
    FCE|SAC|SAC2, FCE|SAC|SAC2, FCE|SAC, 0,
    FAC|FAC2, FAC|FAC2, FCE|SAC, FCE|SAC,
    // 130: UFA DFN FSC IBP ILDB LDB IDPB DPB
    FCE|FBR, FCE|FAC, FAC|SAC, FCEPSE, FCEPSE, FCE, FCEPSE, FCE,
    // 140: FAD FADL FADM FADB FADR FADRI FADRM FADRB
    SAC|FBR|FCE, SAC|SAC2|FBR|FCE, FCEPSE|FBR, SAC|FBR|FCEPSE,
    SAC|FBR|FCE, SAC|FBR|SWAR, FCEPSE|FBR, SAC|FBR|FCEPSE,
    // 150: FSB
    SAC|FBR|FCE, SAC|SAC2|FBR|FCE, FCEPSE|FBR, SAC|FBR|FCEPSE,
    SAC|FBR|FCE, SAC|FBR|SWAR, FCEPSE|FBR, SAC|FBR|FCEPSE,
    // 160: FMP
    SAC|FBR|FCE, SAC|SAC2|FBR|FCE, FCEPSE|FBR, SAC|FBR|FCEPSE,
    SAC|FBR|FCE, SAC|FBR|SWAR, FCEPSE|FBR, SAC|FBR|FCEPSE,
    // 170: FDV
    SAC|FBR|FCE, FAC2|SAC2|SAC|FBR|FCE, FCEPSE|FBR, SAC|FBR|FCEPSE,
    SAC|FBR|FCE, SAC|FBR|SWAR, FCEPSE|FBR, SAC|FBR|FCEPSE,
    // 200: MOVE MOVEI MOVEM MOVES MOVS MOVSI MOVSM MOVSS
    SAC|FCE, SAC, FAC|SCE, SACZ|FCEPSE,
    SWAR|SAC|FCE, SWAR|SAC, SWAR|FAC|SCE, SWAR|SACZ|FCEPSE,
    // 210: MOVN MOVNI MOVNM MOVNS MOVM MOVMI MOVMM MOVMS
    SAC|FCE, SAC, FAC|SCE, SACZ|FCEPSE,
    SAC|FCE, SAC, FAC|SCE, SACZ|FCEPSE,
    // 220: IMUL IMULI IMULM IMULB MUL MULI MULM MULB
    SAC|FCE|FBR, SAC|FBR, FCEPSE|FBR, SAC|FCEPSE|FBR,
    SAC2|SAC|FCE|FBR, SAC2|SAC|FBR, FCEPSE|FBR, SAC2|SAC|FCEPSE|FBR,
    // 230: IDIV IDIVI IDIVM IDIVB DIV DIVI DIVM DIVB
    SAC2|SAC|FCE|FAC, SAC2|SAC|FAC, FCEPSE|FAC, SAC2|SAC|FCEPSE|FAC,
    SAC2|SAC|FCE|FAC, SAC2|SAC|FAC, FCEPSE|FAC, SAC2|SAC|FCEPSE|FAC,
    // 240: ASH ROT LSH JFFO ASHC ROTC LSHC
    FAC|SAC, FAC|SAC, FAC|SAC, FAC,
    FAC|SAC|SAC2|FAC2, FAC|SAC|SAC2|FAC2, FAC|SAC|SAC2|FAC2, 0,
    // 250: EXCH BLT AOBJP AOBJN JRST JFCL XCT MAP
    FAC|FCEPSE, FAC, FAC|SAC, FAC|SAC, 0, 0, 0, SAC,
    // 260: PUSHJ PUSH POP POPJ JSR JSP JSA JRA
    FAC|SAC, FAC|FCE|SAC, FAC|SAC, FAC|SAC, SCE, SAC, FBR|SCE, 0,
    // 270: ADD ADDI ADDM ADDB SUB SUBI SUBM SUBB
    FBR|SAC|FCE, FBR|SAC, FBR|FCEPSE, FBR|SAC|FCEPSE,
    FBR|SAC|FCE, FBR|SAC, FBR|FCEPSE, FBR|SAC|FCEPSE,
    // 300: CAI class
    0, 0, 0, 0, 0, 0, 0, 0,
    // 310: CAM class
    FCE, FCE, FCE, FCE, FCE, FCE, FCE, FCE,
    // 320: JUMP class
    FAC, FAC, FAC, FAC, FAC, FAC, FAC, FAC,
    // 330: SKIP class
    SACZ|FCE, SACZ|FCE, SACZ|FCE, SACZ|FCE,
    SACZ|FCE, SACZ|FCE, SACZ|FCE, SACZ|FCE,
    // 340: AOJ class
    SAC|FAC, SAC|FAC, SAC|FAC, SAC|FAC,
    SAC|FAC, SAC|FAC, SAC|FAC, SAC|FAC,
    // 350: AOS class
    SACZ|FCEPSE, SACZ|FCEPSE, SACZ|FCEPSE, SACZ|FCEPSE,
    SACZ|FCEPSE, SACZ|FCEPSE, SACZ|FCEPSE, SACZ|FCEPSE,
    // 360: SOJ class
    SAC|FAC, SAC|FAC, SAC|FAC, SAC|FAC,
    SAC|FAC, SAC|FAC, SAC|FAC, SAC|FAC,
    // 370: SOS class
    SACZ|FCEPSE, SACZ|FCEPSE, SACZ|FCEPSE, SACZ|FCEPSE,
    SACZ|FCEPSE, SACZ|FCEPSE, SACZ|FCEPSE, SACZ|FCEPSE,
    // 400: SETZ, 404: AND
    FBR|SAC, FBR|SAC, FBR|SCE, FBR|SAC|SCE,
    FBR|SAC|FCE, FBR|SAC, FBR|FCEPSE, FBR|SAC|FCEPSE,
    // 410: ANDCA, 414: SETM
    FBR|SAC|FCE, FBR|SAC, FBR|FCEPSE, FBR|SAC|FCEPSE,
    FBR|SAC|FCE, FBR|SAC, FBR, FBR|SAC|FCE,
    // 420: ANDCM, 424: SETA
    FBR|SAC|FCE, FBR|SAC, FBR|FCEPSE, FBR|SAC|FCEPSE,
    FBR|SAC, FBR|SAC, FBR|SCE, FBR|SAC|SCE,
    // 430: XOR, 434: IOR
    FBR|SAC|FCE, FBR|SAC, FBR|FCEPSE, FBR|SAC|FCEPSE,
    FBR|SAC|FCE, FBR|SAC, FBR|FCEPSE, FBR|SAC|FCEPSE,
    // 440: ANDCB, 444: EQV
    FBR|SAC|FCE, FBR|SAC, FBR|FCEPSE, FBR|SAC|FCEPSE,
    FBR|SAC|FCE, FBR|SAC, FBR|FCEPSE, FBR|SAC|FCEPSE,
    // 450: SETCA, 454: ORCA
    FBR|SAC, FBR|SAC, FBR|SCE, FBR|SAC|SCE,
    FBR|SAC|FCE, FBR|SAC, FBR|FCEPSE, FBR|SAC|FCEPSE,
    // 460: SETCM, 464: ORCM
    FBR|SAC|FCE, FBR|SAC, FBR|FCEPSE, FBR|SAC|FCEPSE,
    FBR|SAC|FCE, FBR|SAC, FBR|FCEPSE, FBR|SAC|FCEPSE,
    // 470: ORCB, 474: SETO
    FBR|SAC|FCE, FBR|SAC, FBR|FCEPSE, FBR|SAC|FCEPSE,
    FBR|SAC, FBR|SAC, FBR|SCE, FBR|SAC|SCE,
    // 500: HLL, 504: HRL
    FBR|SAC|FCE, FBR|SAC, FAC|FMB|FCEPSE, FMB|SACZ|FCEPSE,
    SWAR|FBR|SAC|FCE, SWAR|FBR|SAC, SWAR|FAC|FMB|FCEPSE, SWAR|FMB|SACZ|FCEPSE,
    // 510: HLLZ, 514: HRLZ
    FBR|SAC|FCE, FBR|SAC, FAC|FMB|FCEPSE, FMB|SACZ|FCEPSE,
    SWAR|FBR|SAC|FCE, SWAR|FBR|SAC, SWAR|FAC|FMB|FCEPSE, SWAR|FMB|SACZ|FCEPSE,
    // 520: HLLO, 524: HRLO
    FBR|SAC|FCE, FBR|SAC, FAC|FMB|FCEPSE, FMB|SACZ|FCEPSE,
    SWAR|FBR|SAC|FCE, SWAR|FBR|SAC, SWAR|FAC|FMB|FCEPSE, SWAR|FMB|SACZ|FCEPSE,
    // 530: HLLE, 534: HRLE
    FBR|SAC|FCE, FBR|SAC, FAC|FMB|FCEPSE, FMB|SACZ|FCEPSE,
    SWAR|FBR|SAC|FCE, SWAR|FBR|SAC, SWAR|FAC|FMB|FCEPSE, SWAR|FMB|SACZ|FCEPSE,
    // 540: HRR, 544: HLR
    FBR|SAC|FCE, FBR|SAC, FAC|FMB|FCEPSE, FMB|SACZ|FCEPSE,
    SWAR|FBR|SAC|FCE, SWAR|FBR|SAC, SWAR|FAC|FMB|FCEPSE, SWAR|FMB|SACZ|FCEPSE,
    // 550: HRRZ, 554: HLRZ
    FBR|SAC|FCE, FBR|SAC, FAC|FMB|FCEPSE, FMB|SACZ|FCEPSE,
    SWAR|FBR|SAC|FCE, SWAR|FBR|SAC, SWAR|FAC|FMB|FCEPSE, SWAR|FMB|SACZ|FCEPSE,
    // 560: HRRO, 564: HLRO
    FBR|SAC|FCE, FBR|SAC, FAC|FMB|FCEPSE, FMB|SACZ|FCEPSE,
    SWAR|FBR|SAC|FCE, SWAR|FBR|SAC, SWAR|FAC|FMB|FCEPSE, SWAR|FMB|SACZ|FCEPSE,
    // 570: HRRE, 574: HLRE
    FBR|SAC|FCE, FBR|SAC, FAC|FMB|FCEPSE, FMB|SACZ|FCEPSE,
    SWAR|FBR|SAC|FCE, SWAR|FBR|SAC, SWAR|FAC|FMB|FCEPSE, SWAR|FMB|SACZ|FCEPSE,
    // 600: TRN TLN TRNE TLNE TRNA TLNA TRNN TLNN
    FBR, FBR|SWAR, FBR, FBR|SWAR, FBR, FBR|SWAR, FBR, FBR|SWAR,
    // 610: TDN TSN TDNE TSNE TDNA TSNA TDNN TSNN
    FBR|FCE, FBR|SWAR|FCE, FBR|FCE, FBR|SWAR|FCE,
    FBR|FCE, FBR|SWAR|FCE, FBR|FCE, FBR|SWAR|FCE,
    // 620: TRZ TLZ TRZE TLZE TRZA TLZA TRZN TLZN
    FBR|SAC, FBR|SAC|SWAR, FBR|SAC, FBR|SAC|SWAR,
    FBR|SAC, FBR|SAC|SWAR, FBR|SAC, FBR|SAC|SWAR,
    // 630: TDZ TSZ TDZE TSZE TDZA TSZA TDZN TSZN
    FBR|SAC|FCE, FBR|SAC|SWAR|FCE, FBR|SAC|FCE, FBR|SAC|SWAR|FCE,
    FBR|SAC|FCE, FBR|SAC|SWAR|FCE, FBR|SAC|FCE, FBR|SAC|SWAR|FCE,
    // 640: TRC TLC TRCE TLCE TRCA TLCA TRCN TLCN
    FBR|SAC, FBR|SAC|SWAR, FBR|SAC, FBR|SAC|SWAR,
    FBR|SAC, FBR|SAC|SWAR, FBR|SAC, FBR|SAC|SWAR,
    // 650: TDC TSC TDCE TSCE TDCA TSCA TDCN TSCN
    FBR|SAC|FCE, FBR|SAC|SWAR|FCE, FBR|SAC|FCE, FBR|SAC|SWAR|FCE,
    FBR|SAC|FCE, FBR|SAC|SWAR|FCE, FBR|SAC|FCE, FBR|SAC|SWAR|FCE,
    // 660: TRO TLO TROE TLOE TROA TLOA TRON TLON
    FBR|SAC, FBR|SAC|SWAR, FBR|SAC, FBR|SAC|SWAR,
    FBR|SAC, FBR|SAC|SWAR, FBR|SAC, FBR|SAC|SWAR,
    // 670: TDO TSO TDOE TSOE TDOA TSOA TDON TSON
    FBR|SAC|FCE, FBR|SAC|SWAR|FCE, FBR|SAC|FCE, FBR|SAC|SWAR|FCE,
    FBR|SAC|FCE, FBR|SAC|SWAR|FCE, FBR|SAC|FCE, FBR|SAC|SWAR|FCE,
    // 700-777: in-out
    0, 0, 0, 0, 0, 0, 0, 0,                                     // 700
    0, 0, 0, 0, 0, 0, 0, 0,                                     // 710
    0, 0, 0, 0, 0, 0, 0, 0,                                     // 720
    0, 0, 0, 0, 0, 0, 0, 0,                                     // 730
    0, 0, 0, 0, 0, 0, 0, 0,                                     // 740
    0, 0, 0, 0, 0, 0, 0, 0,                                     // 750
    0, 0, 0, 0, 0, 0, 0, 0,                                     // 760
    0, 0, 0, 0, 0, 0, 0, 0,                                     // 770
];

/// Which processor the machine emulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuModel {
    /// Base and bounds relocation, single precision floating point.
    Ka,
    /// Pager, doubleword moves, double precision floating point,
    /// trap flags.
    Ki,
}

impl CpuModel {
    /// Largest configurable memory, in units of 1024 words.
    pub fn memory_limit_k_words(&self) -> u64 {
        match self {
            CpuModel::Ka => 256,
            CpuModel::Ki => 4096,
        }
    }
}

/// Startup configuration for a [`Machine`].
#[derive(Debug, Clone)]
pub struct MachineConfig {
    pub model: CpuModel,
    pub memory: MemoryConfiguration,
    /// Instruction history ring size; zero disables recording.
    pub history_size: usize,
    /// KA10 only: wire up the high-moiety relocation registers.
    pub two_segment: bool,
}

impl Default for MachineConfig {
    fn default() -> MachineConfig {
        MachineConfig {
            model: CpuModel::Ka,
            memory: MemoryConfiguration { k_words: 256 },
            history_size: 0,
            two_segment: true,
        }
    }
}

/// A memory reference the translation hardware or memory itself
/// refused.  The fault side effects (protection flag, page fail
/// word, interrupt request) have already been applied; the
/// instruction in progress just stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Abort;

/// Where execution resumes after an instruction body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum After {
    /// Fall into the store cycle.
    Store,
    /// Skip the store cycle; a memory reference was refused or the
    /// instruction placed its own results.
    Last,
    /// Run the operand cycle and dispatch again.  Block transfers
    /// convert themselves into the corresponding data transfer this
    /// way.
    ReOperand,
}

/// The processor.
pub struct Machine {
    model: CpuModel,
    /// Fast memory: sixteen accumulators, four blocks of sixteen on
    /// the KI10.
    fm: [u64; 64],
    pc: u64,
    flags: Flags,

    // Datapath registers.
    ar: u64,
    br: u64,
    mq: u64,
    mb: u64,
    /// Memory address register.
    ab: u64,
    ir: u64,
    ac: u64,
    /// Shift counter; survives between the two halves of a byte
    /// instruction.
    sc: i32,
    /// Address the current instruction was fetched from.
    inst_addr: u64,

    // Instruction sequencing.
    i_flags: u16,
    f_load_pc: bool,
    f_inst_fetch: bool,
    f_pc_inh: bool,
    /// Second half of a byte instruction is pending.
    byf5: bool,
    uuo_cycle: bool,
    sac_inh: bool,
    nrf: bool,
    fxu_hold_set: bool,

    // Interrupt sequencing.
    pi_cycle: bool,
    pi_ov: bool,
    pi_hold: bool,
    pi_restore: bool,

    // Processor condition state (CONO/CONI APR).
    apr_irq: u32,
    clk_irq: u32,
    clk_flg: bool,
    clk_en: bool,
    ov_irq: bool,
    fov_irq: bool,
    push_ovf: bool,
    mem_prot: bool,
    nxm_flag: bool,

    // KI10 extras.
    xct_flag: u64,
    modify: bool,
    inout_fail: bool,
    timer_irq: bool,
    timer_flg: bool,

    reloc: BaseBounds,
    pager: Pager,
    pi: PiSystem,
    memory: MemoryUnit,
    bus: DeviceBus,
    events: EventQueue,
    history: History,
    stop: Option<StopReason>,
    /// Stop before executing the instruction at this address.
    breakpoint: Option<u64>,
    /// Let the next fetch through even if it matches the breakpoint,
    /// so a stopped run can be resumed.
    bkpt_pass: bool,
}

impl Machine {
    pub fn new(config: &MachineConfig) -> Result<Machine, ConfigError> {
        let memory = MemoryUnit::new(&config.memory, config.model.memory_limit_k_words())?;
        let bus = match config.model {
            CpuModel::Ka => DeviceBus::new(&[(APR, "APR"), (PI, "PI")]),
            CpuModel::Ki => DeviceBus::new(&[(APR, "APR"), (PI, "PI"), (PAG, "PAG")]),
        };
        let mut machine = Machine {
            model: config.model,
            fm: [0; 64],
            pc: 0,
            flags: Flags::default(),
            ar: 0,
            br: 0,
            mq: 0,
            mb: 0,
            ab: 0,
            ir: 0,
            ac: 0,
            sc: 0,
            inst_addr: 0,
            i_flags: 0,
            f_load_pc: true,
            f_inst_fetch: true,
            f_pc_inh: false,
            byf5: false,
            uuo_cycle: false,
            sac_inh: false,
            nrf: false,
            fxu_hold_set: false,
            pi_cycle: false,
            pi_ov: false,
            pi_hold: false,
            pi_restore: false,
            apr_irq: 0,
            clk_irq: 0,
            clk_flg: false,
            clk_en: false,
            ov_irq: false,
            fov_irq: false,
            push_ovf: false,
            mem_prot: false,
            nxm_flag: false,
            xct_flag: 0,
            modify: false,
            inout_fail: false,
            timer_irq: false,
            timer_flg: false,
            reloc: BaseBounds {
                two_segment: config.two_segment,
                ..BaseBounds::default()
            },
            pager: Pager::default(),
            pi: PiSystem::default(),
            memory,
            bus,
            events: EventQueue::new(),
            history: History::new(config.history_size),
            stop: None,
            breakpoint: None,
            bkpt_pass: false,
        };
        machine.reset();
        Ok(machine)
    }

    pub fn model(&self) -> CpuModel {
        self.model
    }

    fn is_ki(&self) -> bool {
        self.model == CpuModel::Ki
    }

    pub fn pc(&self) -> u64 {
        self.pc
    }

    pub fn set_pc(&mut self, addr: u64) {
        self.pc = addr & RMASK;
    }

    /// The processor flag register.
    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Change the history ring size; existing entries are dropped.
    pub fn set_history_size(&mut self, size: usize) {
        self.history.resize(size);
    }

    /// Stop the next time a normal instruction fetch reaches `addr`.
    /// `None` removes the breakpoint.
    pub fn set_breakpoint(&mut self, addr: Option<u64>) {
        self.breakpoint = addr.map(|a| a & RMASK);
    }

    /// Plug an external device in at `code`.
    pub fn attach_device(
        &mut self,
        code: u64,
        dev: Box<dyn IoDevice>,
    ) -> Result<(), DeviceConflict> {
        self.bus.attach(code, dev)
    }

    /// Operator read: fast memory below 020, core above.
    pub fn examine(&self, addr: u64) -> Result<u64, ConfigError> {
        if addr < 0o20 {
            Ok(self.fm[addr as usize])
        } else {
            self.memory.fetch(addr).map_err(|_| ConfigError::AddressOutOfRange {
                addr,
                size: self.memory.size(),
            })
        }
    }

    /// Operator write: fast memory below 020, core above.
    pub fn deposit(&mut self, addr: u64, value: u64) -> Result<(), ConfigError> {
        if addr < 0o20 {
            self.fm[addr as usize] = value & FMASK;
            Ok(())
        } else {
            self.memory.store(addr, value).map_err(|_| ConfigError::AddressOutOfRange {
                addr,
                size: self.memory.size(),
            })
        }
    }

    /// Return the processor to its power-on state.  The program
    /// counter and memory contents are left alone.
    pub fn reset(&mut self) {
        self.byf5 = false;
        self.uuo_cycle = false;
        self.flags = Flags::default();
        self.pi_cycle = false;
        self.pi_ov = false;
        self.pi_hold = false;
        self.pi_restore = false;
        self.f_load_pc = true;
        self.f_inst_fetch = true;
        self.f_pc_inh = false;
        self.push_ovf = false;
        self.mem_prot = false;
        self.nxm_flag = false;
        self.clk_flg = false;
        self.clk_en = false;
        self.clk_irq = 0;
        self.apr_irq = 0;
        self.ov_irq = false;
        self.fov_irq = false;
        self.inout_fail = false;
        self.timer_irq = false;
        self.timer_flg = false;
        self.xct_flag = 0;
        self.modify = false;
        self.reloc = BaseBounds {
            two_segment: self.reloc.two_segment,
            ..BaseBounds::default()
        };
        self.pager = Pager::default();
        self.pi = PiSystem::default();
        self.bus.reset_all(&mut self.pi);
        self.stop = None;
        self.events.cancel(APR);
        self.events.schedule(APR, CLOCK_PERIOD);
    }

    /// Run until the program halts or `max_steps` instructions have
    /// executed.
    pub fn run(&mut self, max_steps: u64) -> StopReason {
        self.f_load_pc = true;
        self.f_inst_fetch = true;
        self.uuo_cycle = false;
        self.push_ovf = false;
        self.mem_prot = false;
        self.nxm_flag = false;
        self.pi_cycle = false;
        self.pi_ov = false;
        self.byf5 = false;
        // Resuming from a breakpoint executes the instruction under
        // it.
        self.bkpt_pass = true;
        for _ in 0..max_steps {
            if let Some(stop) = self.step() {
                return stop;
            }
        }
        StopReason::StepLimit { steps: max_steps }
    }

    /// Execute one instruction, including any interrupt grant or
    /// trap chain it sets off.
    pub fn step(&mut self) -> Option<StopReason> {
        self.process_events();

        if self.f_load_pc {
            if self.breakpoint == Some(self.pc) && !self.bkpt_pass {
                event!(Level::INFO, "breakpoint at {:06o}", self.pc);
                return Some(StopReason::Breakpoint { at: self.pc });
            }
            self.bkpt_pass = false;
            self.ab = self.pc;
            self.uuo_cycle = false;
            self.xct_flag = 0;
        }

        let mut pi_rq = false;
        let mut force_fetch = false;
        'fetch: loop {
            if self.f_inst_fetch || force_fetch {
                force_fetch = false;
                // A fetch that fails leaves the previous contents of
                // MB to be executed; the fault flags are already up.
                let _ = self.mem_read(self.pi_cycle || self.uuo_cycle);
                self.inst_addr = self.ab;
                let inst = Instruction::from_word(self.mb);
                self.ir = inst.opcode();
                self.ac = inst.ac();
                self.i_flags = OPFLAGS[self.ir as usize];
                if self.model == CpuModel::Ka && matches!(self.ir, 0o110..=0o127) {
                    // Doubleword and fix/float conversion codes exist
                    // only on the KI10.
                    self.i_flags = 0;
                }
                self.byf5 = false;
            }

            // Second half of an interrupted byte instruction: the
            // saved pointer supplies the byte address.
            if self.byf5 {
                self.i_flags = FCE;
                self.ab = self.ar & RMASK;
            }

            if self.history.is_enabled() {
                let ac_now = self.get_reg(self.ac);
                self.history.record(HistoryEntry {
                    pc: if self.byf5 { self.pc } else { self.ab },
                    ea: self.ab,
                    inst: self.mb,
                    flags: (self.flags.bits() << 4)
                        | (u32::from(self.clk_flg) << 3)
                        | (u32::from(self.mem_prot) << 2)
                        | (u32::from(self.nxm_flag) << 1)
                        | u32::from(self.push_ovf),
                    ac: ac_now,
                    ..HistoryEntry::default()
                });
            }

            // Effective address; repeats while the word is indirect.
            loop {
                if self.pi.enabled && !self.pi_cycle && self.pi.pending {
                    pi_rq = self.pi.check_irq_level();
                }
                let ind = self.mb & IND_BIT != 0;
                self.ar = self.mb;
                self.ab = self.mb & RMASK;
                if self.mb & 0o17_000_000 != 0 {
                    let index = self.get_reg((self.mb >> 18) & 0o17);
                    self.mb = (self.ab + index) & FMASK;
                    self.ar = self.mb;
                    self.ab = self.mb & RMASK;
                }
                if self.ir != 0o254 {
                    self.ar &= RMASK;
                }
                if ind && !pi_rq {
                    let _ = self.mem_read(self.pi_cycle || self.uuo_cycle);
                }
                self.events.advance(1);
                self.process_events();
                if !(ind && !pi_rq) {
                    break;
                }
            }

            if let Some(entry) = self.history.last_mut() {
                entry.ea = self.ab;
            }

            // Grant the interrupt: the level goes on hold and the
            // vector instruction executes in an interrupt cycle.
            if pi_rq {
                self.pi.set_hold();
                self.pi_cycle = true;
                pi_rq = false;
                self.pi_hold = false;
                self.pi_ov = false;
                self.ab = 0o40 | u64::from(self.pi.enc << 1);
                event!(Level::DEBUG, "interrupt grant level {} vector {:03o}", self.pi.enc, self.ab);
                force_fetch = true;
                continue 'fetch;
            }

            // Operand cycle, execution, store cycle.
            let after = 'opr: loop {
                self.f_inst_fetch = true;
                self.f_load_pc = true;
                self.f_pc_inh = false;
                self.nrf = false;
                self.fxu_hold_set = false;
                self.sac_inh = false;
                self.modify = false;

                if self.i_flags & (FCEPSE | FCE) != 0 {
                    self.modify = true;
                    if self.mem_read(false).is_err() {
                        break 'opr After::Last;
                    }
                    self.ar = self.mb;
                }
                if self.i_flags & FAC != 0 {
                    self.br = self.ar;
                    self.ar = self.get_reg(self.ac);
                }
                if self.i_flags & SWAR != 0 {
                    self.ar = swap(self.ar);
                }
                if self.i_flags & FBR != 0 {
                    self.br = self.get_reg(self.ac);
                }
                if self.i_flags & FMB != 0 {
                    self.br = self.mb;
                }
                if let Some(entry) = self.history.last_mut() {
                    entry.operand = self.ar;
                }
                if self.i_flags & FAC2 != 0 {
                    self.mq = self.get_reg((self.ac + 1) & 0o17);
                } else if !self.byf5 {
                    self.mq = 0;
                }

                match self.dispatch() {
                    After::ReOperand => continue 'opr,
                    other => break 'opr other,
                }
            };

            if after == After::Store {
                let mut refused = false;
                if !self.sac_inh && self.i_flags & (SCE | FCEPSE) != 0 {
                    self.mb = self.ar;
                    refused = self.mem_write(false).is_err();
                }
                if !refused {
                    if !self.sac_inh
                        && (self.i_flags & SAC != 0
                            || (self.i_flags & SACZ != 0 && self.ac != 0))
                    {
                        self.set_reg(self.ac, self.ar, false);
                    }
                    if !self.sac_inh && self.i_flags & SAC2 != 0 {
                        let even_odd = (self.ac + 1) & 0o17;
                        self.set_reg(even_odd, self.mq, false);
                    }
                    if let Some(entry) = self.history.last_mut() {
                        entry.result = self.ar;
                    }
                }
            }

            // End of instruction: advance the program counter unless
            // something inhibited it, then settle the interrupt
            // cycle.
            if !self.f_pc_inh && !self.pi_cycle {
                self.pc = (self.pc + 1) & RMASK;
            }

            if self.pi_cycle {
                if self.ir & 0o700 == 0o700 && self.ac & 0o4 == 0 {
                    // Block and data transfers dismiss unless the
                    // pointer word ran out, which sends control to
                    // the second vector instruction.
                    self.pi_hold = self.pi_ov;
                    if !self.pi_hold && self.f_inst_fetch {
                        self.pi_restore = true;
                        self.pi_cycle = false;
                    } else {
                        self.ab = 0o40 | u64::from(self.pi.enc << 1) | u64::from(self.pi_ov);
                        self.pi_ov = false;
                        self.pi_hold = false;
                        force_fetch = true;
                        continue 'fetch;
                    }
                } else if self.pi_hold {
                    self.ab = 0o40 | u64::from(self.pi.enc << 1) | u64::from(self.pi_ov);
                    self.pi_ov = false;
                    self.pi_hold = false;
                    force_fetch = true;
                    continue 'fetch;
                } else {
                    self.f_inst_fetch = true;
                    self.f_load_pc = true;
                    self.pi_cycle = false;
                }
            }
            break 'fetch;
        }

        if self.pi_restore {
            if self.pi.restore_hold() {
                self.check_apr_irq();
            }
            self.pi_restore = false;
        }
        self.events.advance(1);
        self.stop.take()
    }

    /// Route one decoded instruction to its execution body.
    fn dispatch(&mut self) -> After {
        match self.ir & 0o770 {
            0o000 | 0o010 | 0o020 | 0o030 | 0o040 | 0o050 | 0o060 | 0o070 => self.op_uuo(),
            0o100 | 0o110 | 0o120 if self.model == CpuModel::Ka => self.op_unassigned(),
            0o100 => self.op_muuo(),
            0o110 => self.op_double_fp(),
            0o120 => self.op_double_move(),
            0o130 => match self.ir & 0o7 {
                0 => self.op_fadd(),
                1 => self.op_dfn(),
                2 => self.op_fsc(),
                _ => self.op_byte(),
            },
            0o140 | 0o150 => self.op_fadd(),
            0o160 => self.op_fmp(),
            0o170 => self.op_fdv(),
            0o200 | 0o210 => self.op_move(),
            0o220 => self.op_multiply(),
            0o230 => self.op_divide(),
            0o240 => self.op_shift(),
            0o250 => match self.ir & 0o7 {
                0 => self.op_exch(),
                1 => self.op_blt(),
                2 | 3 => self.op_aobj(),
                4 => self.op_jrst(),
                5 => self.op_jfcl(),
                6 => self.op_xct(),
                _ => self.op_map(),
            },
            0o260 => match self.ir & 0o7 {
                0 => self.op_pushj(),
                1 => self.op_push(),
                2 => self.op_pop(),
                3 => self.op_popj(),
                4 => self.op_jsr(),
                5 => self.op_jsp(),
                6 => self.op_jsa(),
                _ => self.op_jra(),
            },
            0o270 => self.op_add_sub(),
            0o300..=0o370 => self.op_skip_class(),
            0o400..=0o470 => self.op_boolean(),
            0o500..=0o570 => self.op_halfword(),
            0o600..=0o670 => self.op_test(),
            _ => self.op_iot(),
        }
    }

    /// Drain the service queue.
    fn process_events(&mut self) {
        while let Some(code) = self.events.take_due() {
            if code == APR {
                self.clock_service();
            } else {
                match self.bus.service(code, &mut self.pi) {
                    DeviceOutcome::Reschedule(delay) => self.events.schedule(code, delay),
                    DeviceOutcome::Idle => {}
                }
            }
        }
    }

    /// The 60 Hz interval clock.
    fn clock_service(&mut self) {
        self.clk_flg = true;
        if self.clk_en {
            self.pi.set_interrupt(PI, self.clk_irq);
        }
        self.events.schedule(APR, CLOCK_PERIOD);
    }

    /// Re-derive the processor's own interrupt requests from the
    /// error flags and clock state.
    fn check_apr_irq(&mut self) {
        self.pi.clr_interrupt(APR);
        self.pi.clr_interrupt(PI);
        if self.is_ki() && !self.pager.enabled {
            return;
        }
        if self.apr_irq != 0 {
            let mut flg = (self.flags.overflow() && self.ov_irq)
                || (self.flags.float_overflow() && self.fov_irq);
            if self.is_ki() {
                flg |= self.clk_flg && self.clk_irq != 0;
            }
            flg |= self.nxm_flag || self.mem_prot || self.push_ovf;
            if flg {
                self.pi.set_interrupt(APR, self.apr_irq);
            }
        }
        if self.clk_flg && self.clk_en {
            self.pi.set_interrupt(PI, self.clk_irq);
        }
    }

    /// Whether a reference belongs to user space, counting the
    /// executive XCT overrides.
    fn reference_is_user(&self, flag: bool, write: bool) -> bool {
        (!flag && self.flags.user())
            || (self.xct_flag & 1 != 0 && (!write || self.modify))
            || (self.xct_flag & 2 != 0 && write)
    }

    /// Translate a virtual address.  `flag` forces an executive
    /// reference (interrupt and trap cycles).  Fault state is
    /// recorded here; the caller just abandons the reference.
    fn page_lookup(&mut self, addr: u64, flag: bool, write: bool) -> Result<u64, Abort> {
        match self.model {
            CpuModel::Ka => {
                if !flag && self.flags.user() {
                    match self.reloc.translate(addr, write) {
                        Ok(physical) => Ok(physical),
                        Err(_) => {
                            self.mem_prot = true;
                            self.pi.set_interrupt(APR, self.apr_irq);
                            event!(Level::DEBUG, "memory protection violation at {:06o}", addr);
                            Err(Abort)
                        }
                    }
                } else {
                    Ok(addr)
                }
            }
            CpuModel::Ki => {
                let user = self.reference_is_user(flag, write);
                match self.pager.translate(&self.memory, addr, user, write) {
                    Ok(physical) => Ok(physical),
                    Err(_) => {
                        event!(
                            Level::DEBUG,
                            "page fail at {:06o}, fail word {:012o}",
                            addr,
                            self.pager.fault_data
                        );
                        Err(Abort)
                    }
                }
            }
        }
    }

    /// One memory read cycle into MB.  Addresses below 020 reference
    /// fast memory and cost no time.
    fn mem_read(&mut self, flag: bool) -> Result<(), Abort> {
        if self.ab < 0o20 {
            self.mb = self.get_reg(self.ab);
            return Ok(());
        }
        self.events.advance(1);
        let addr = self.page_lookup(self.ab, flag, false)?;
        match self.memory.fetch(addr) {
            Ok(word) => {
                self.mb = word;
                Ok(())
            }
            Err(_) => {
                self.nxm_flag = true;
                self.pi.set_interrupt(APR, self.apr_irq);
                event!(Level::DEBUG, "non-existent memory read at {:08o}", addr);
                Err(Abort)
            }
        }
    }

    /// One memory write cycle from MB.
    fn mem_write(&mut self, flag: bool) -> Result<(), Abort> {
        if self.ab < 0o20 {
            let (ab, mb) = (self.ab, self.mb);
            self.set_reg(ab, mb, true);
            return Ok(());
        }
        self.events.advance(1);
        let addr = self.page_lookup(self.ab, flag, true)?;
        match self.memory.store(addr, self.mb) {
            Ok(()) => Ok(()),
            Err(_) => {
                self.nxm_flag = true;
                self.pi.set_interrupt(APR, self.apr_irq);
                event!(Level::DEBUG, "non-existent memory write at {:08o}", addr);
                Err(Abort)
            }
        }
    }

    /// Read an accumulator.  On the KI10 the selected fast memory
    /// block applies, and an executive XCT can redirect the
    /// reference to the previous context's accumulators.
    fn get_reg(&mut self, reg: u64) -> u64 {
        let reg = reg & 0o17;
        if !self.is_ki() {
            return self.fm[reg as usize];
        }
        if self.flags.user() {
            self.fm[(self.pager.ac_block | reg) as usize]
        } else if self.xct_flag & 1 != 0 {
            if self.flags.user_io() {
                if self.pager.ac_block == 0 {
                    if let Ok(addr) = self.page_lookup(reg, false, false) {
                        return self.memory.fetch(addr).unwrap_or(0);
                    }
                }
                self.fm[(self.pager.ac_block | reg) as usize]
            } else {
                let addr = self.pager.ub_ptr + self.pager.ac_stack + reg;
                self.memory.fetch(addr).unwrap_or(0)
            }
        } else {
            self.fm[reg as usize]
        }
    }

    /// Write an accumulator; `mem` marks a store arriving through a
    /// memory cycle rather than the store cycle proper, which the
    /// executive XCT redirect distinguishes.
    fn set_reg(&mut self, reg: u64, value: u64, mem: bool) {
        let reg = reg & 0o17;
        if !self.is_ki() {
            self.fm[reg as usize] = value;
            return;
        }
        if self.flags.user() {
            self.fm[(self.pager.ac_block | reg) as usize] = value;
        } else if (self.xct_flag & 1 != 0 && mem && self.modify)
            || (self.xct_flag & 1 != 0 && !mem)
            || self.xct_flag & 2 != 0
        {
            if self.flags.user_io() {
                if self.pager.ac_block == 0 {
                    if let Ok(addr) = self.page_lookup(reg, false, true) {
                        let _ = self.memory.store(addr, value);
                    }
                } else {
                    self.fm[(self.pager.ac_block | reg) as usize] = value;
                }
                return;
            }
            let addr = self.pager.ub_ptr + self.pager.ac_stack + reg;
            let _ = self.memory.store(addr, value);
        } else {
            self.fm[reg as usize] = value;
        }
    }
}
