// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Application hand-off: vector table validation, peripheral shutdown and jump.

use serboot_common::protocol::APP_REGION_END;

const RAM_START: u32 = 0x2000_0000;
/// End of SRAM4/5; an initial SP may point exactly here.
const RAM_END: u32 = 0x2004_2000;

struct VectorTable {
    initial_sp: u32,
    reset_vector: u32,
}

impl VectorTable {
    unsafe fn read_from(addr: u32) -> Self {
        Self {
            initial_sp: (addr as *const u32).read_volatile(),
            reset_vector: (addr as *const u32).offset(1).read_volatile(),
        }
    }

    /// SP inside SRAM, reset handler a Thumb address inside the image region.
    fn is_valid_for(&self, entry: u32) -> bool {
        let handler = self.reset_vector & !1;
        (RAM_START..=RAM_END).contains(&self.initial_sp)
            && self.reset_vector & 1 == 1
            && (entry..APP_REGION_END).contains(&handler)
    }
}

/// Jump to the application whose vector table sits at `entry`.
///
/// An erased or garbage vector table resets into the bootloader instead.
pub fn jump_to_app(entry: u32) -> ! {
    let vt = unsafe { VectorTable::read_from(entry) };
    if !vt.is_valid_for(entry) {
        defmt::println!(
            "No valid application at 0x{:08x} (sp=0x{:08x}, reset=0x{:08x}), resetting",
            entry,
            vt.initial_sp,
            vt.reset_vector
        );
        system_reset();
    }

    defmt::println!("Jumping to application at 0x{:08x}", entry);

    unsafe {
        prepare_for_app_handoff();
        relocate_vector_table(entry);
        jump(vt.initial_sp, vt.reset_vector)
    }
}

pub fn system_reset() -> ! {
    cortex_m::interrupt::disable();
    cortex_m::peripheral::SCB::sys_reset();
}

/// Put the peripherals the bootloader used back into reset.
/// Clocks are left configured - the application's runtime init switches
/// clk_sys to clk_ref before touching the PLLs.
unsafe fn prepare_for_app_handoff() {
    // Disable all interrupts
    cortex_m::interrupt::disable();

    // Disable all NVIC interrupts
    const NVIC_ICER: *mut u32 = 0xE000_E180 as *mut u32;
    NVIC_ICER.write_volatile(0xFFFF_FFFF);

    // Clear all pending interrupts in NVIC
    const NVIC_ICPR: *mut u32 = 0xE000_E280 as *mut u32;
    NVIC_ICPR.write_volatile(0xFFFF_FFFF);

    const RESETS_BASE: u32 = 0x4000_C000;
    const RESETS_RESET: *mut u32 = RESETS_BASE as *mut u32;
    const TIMER_RESET_BIT: u32 = 1 << 21;
    const UART0_RESET_BIT: u32 = 1 << 22;

    let reset = RESETS_RESET.read_volatile();
    RESETS_RESET.write_volatile(reset | TIMER_RESET_BIT | UART0_RESET_BIT);

    cortex_m::asm::dsb();
    cortex_m::asm::isb();
}

unsafe fn relocate_vector_table(table: u32) {
    const SCB_VTOR: *mut u32 = 0xE000_ED08 as *mut u32;
    SCB_VTOR.write_volatile(table);

    cortex_m::asm::dsb();
    cortex_m::asm::isb();
}

unsafe fn jump(initial_sp: u32, reset_vector: u32) -> ! {
    core::arch::asm!(
        "msr msp, {sp}",
        "cpsie i",  // Re-enable interrupts before jumping (SDK expects PRIMASK=0)
        "bx {reset}",
        sp = in(reg) initial_sp,
        reset = in(reg) reset_vector,
        options(noreturn)
    );
}
