//! Scratch register pool
//!
//! Expression evaluation draws registers from a fixed window (r3-r10
//! in each file) in strict LIFO order. There is no spilling: when the
//! window is exhausted the expression is too deep and lowering fails
//! with a reported error. Releases must mirror acquires exactly; the
//! pool checks the recorded allocation depth of every operand handed
//! back and rejects out-of-order releases, which would otherwise let
//! two live values share a register silently.

use acc_codegen::{AddrMode, Operand, Reg};
use acc_common::CodegenError;
use log::trace;

/// LIFO allocator over the two scratch windows.
///
/// The integer and floating files have separate stacks but identical
/// windows. An operand remembers the bank through its addressing mode
/// and the stack position through its `depth` field.
#[derive(Debug, Default)]
pub struct TempPool {
    next_int: u8,
    next_fp: u8,
    max_int: u8,
    max_fp: u8,
}

impl TempPool {
    pub fn new() -> Self {
        TempPool::default()
    }

    /// Acquire the next integer scratch register
    pub fn acquire(&mut self) -> Result<Operand, CodegenError> {
        if self.next_int >= Reg::TEMP_COUNT {
            return Err(CodegenError::PoolExhausted { bank: "int" });
        }
        let depth = self.next_int;
        self.next_int += 1;
        if self.next_int > self.max_int {
            self.max_int = self.next_int;
        }
        let reg = Reg(Reg::FIRST_TEMP.0 + depth);
        trace!("acquire {} (depth {})", reg, depth);
        let mut ap = Operand::reg_direct(reg);
        ap.temp = true;
        ap.depth = depth;
        Ok(ap)
    }

    /// Acquire the next floating scratch register
    pub fn acquire_fp(&mut self) -> Result<Operand, CodegenError> {
        if self.next_fp >= Reg::TEMP_COUNT {
            return Err(CodegenError::PoolExhausted { bank: "float" });
        }
        let depth = self.next_fp;
        self.next_fp += 1;
        if self.next_fp > self.max_fp {
            self.max_fp = self.next_fp;
        }
        let reg = Reg(Reg::FIRST_TEMP.0 + depth);
        trace!("acquire f{} (depth {})", reg.0, depth);
        let mut ap = Operand::fp_reg(reg);
        ap.temp = true;
        ap.depth = depth;
        Ok(ap)
    }

    /// Release every scratch register an operand holds.
    ///
    /// A two-register operand hands back the deeper of its registers
    /// first, whichever field that is. Operands that hold no scratch
    /// registers release nothing.
    pub fn release(&mut self, ap: &Operand) -> Result<(), CodegenError> {
        if ap.temp && ap.temp2 && ap.depth > ap.depth2 {
            self.pop_primary(ap)?;
            return self.pop_int(ap.sreg, ap.depth2);
        }
        if ap.temp2 {
            self.pop_int(ap.sreg, ap.depth2)?;
        }
        if ap.temp {
            self.pop_primary(ap)?;
        }
        Ok(())
    }

    fn pop_primary(&mut self, ap: &Operand) -> Result<(), CodegenError> {
        if ap.mode == AddrMode::FpReg {
            self.pop_fp(ap.reg, ap.depth)
        } else {
            self.pop_int(ap.reg, ap.depth)
        }
    }

    fn pop_int(&mut self, reg: Reg, depth: u8) -> Result<(), CodegenError> {
        if self.next_int == 0 {
            return Err(CodegenError::RegisterUnderflow);
        }
        if depth != self.next_int - 1 {
            return Err(CodegenError::RegisterOrder { reg: reg.0 });
        }
        self.next_int -= 1;
        trace!("release {} (depth {})", reg, depth);
        Ok(())
    }

    fn pop_fp(&mut self, reg: Reg, depth: u8) -> Result<(), CodegenError> {
        if self.next_fp == 0 {
            return Err(CodegenError::RegisterUnderflow);
        }
        if depth != self.next_fp - 1 {
            return Err(CodegenError::RegisterOrder { reg: reg.0 });
        }
        self.next_fp -= 1;
        trace!("release f{} (depth {})", reg.0, depth);
        Ok(())
    }

    /// Both stacks empty; must hold between statements
    pub fn balanced(&self) -> bool {
        self.next_int == 0 && self.next_fp == 0
    }

    /// Current integer stack depth
    pub fn depth(&self) -> u8 {
        self.next_int
    }

    /// High-water mark of the integer stack
    pub fn max_depth(&self) -> u8 {
        self.max_int
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_lifo_acquire_release() {
        let mut pool = TempPool::new();
        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        assert_eq!(a.reg, Reg(3));
        assert_eq!(b.reg, Reg(4));
        pool.release(&b).unwrap();
        pool.release(&a).unwrap();
        assert!(pool.balanced());
    }

    #[test]
    fn test_out_of_order_release_rejected() {
        let mut pool = TempPool::new();
        let a = pool.acquire().unwrap();
        let _b = pool.acquire().unwrap();
        let err = pool.release(&a).unwrap_err();
        assert_eq!(err, CodegenError::RegisterOrder { reg: 3 });
    }

    #[test]
    fn test_exhaustion() {
        let mut pool = TempPool::new();
        let mut held = Vec::new();
        for _ in 0..Reg::TEMP_COUNT {
            held.push(pool.acquire().unwrap());
        }
        let err = pool.acquire().unwrap_err();
        assert_eq!(err, CodegenError::PoolExhausted { bank: "int" });
    }

    #[test]
    fn test_underflow() {
        let mut pool = TempPool::new();
        let mut a = Operand::reg_direct(Reg(3));
        a.temp = true;
        assert_eq!(pool.release(&a).unwrap_err(), CodegenError::RegisterUnderflow);
    }

    #[test]
    fn test_non_temp_release_is_noop() {
        let mut pool = TempPool::new();
        pool.release(&Operand::immed(5)).unwrap();
        pool.release(&Operand::reg_direct(Reg::FP)).unwrap();
        assert!(pool.balanced());
    }

    #[test]
    fn test_banks_are_independent() {
        let mut pool = TempPool::new();
        let i = pool.acquire().unwrap();
        let f = pool.acquire_fp().unwrap();
        assert_eq!(i.reg, Reg(3));
        assert_eq!(f.reg, Reg(3));
        pool.release(&f).unwrap();
        pool.release(&i).unwrap();
        assert!(pool.balanced());
    }

    #[test]
    fn test_indexed2_releases_index_first() {
        let mut pool = TempPool::new();
        let base = pool.acquire().unwrap();
        let index = pool.acquire().unwrap();
        let mut ap = Operand::reg_direct(base.reg);
        ap.mode = AddrMode::Indexed2;
        ap.temp = true;
        ap.depth = base.depth;
        ap.sreg = index.reg;
        ap.temp2 = true;
        ap.depth2 = index.depth;
        pool.release(&ap).unwrap();
        assert!(pool.balanced());
    }
}
