use dslab_iops::core::io_provisioner::{IoProvisioner, SimpleIoProvisioner};

#[test]
fn test_allocation() {
    let mut provisioner = SimpleIoProvisioner::new(1000);
    // request is limited by VM maximum
    assert!(provisioner.allocate(1, 700, 600));
    assert_eq!(provisioner.allocated(1), 600);
    assert_eq!(provisioner.available(), 400);

    assert!(!provisioner.allocate(2, 500, 500));
    assert_eq!(provisioner.allocated(2), 0);
    assert_eq!(provisioner.available(), 400);

    provisioner.deallocate(1);
    assert_eq!(provisioner.available(), 1000);
    assert!(provisioner.allocate(2, 500, 500));
    assert_eq!(provisioner.used(), 500);
}

#[test]
// Reallocation releases the previous slice first, failed reallocation leaves the VM with nothing.
fn test_resize() {
    let mut provisioner = SimpleIoProvisioner::new(1000);
    provisioner.allocate(1, 600, 1000);
    assert!(provisioner.allocate(1, 900, 1000));
    assert_eq!(provisioner.available(), 100);

    provisioner.allocate(2, 100, 1000);
    assert!(!provisioner.allocate(1, 1000, 1000));
    assert_eq!(provisioner.allocated(1), 0);
    assert_eq!(provisioner.available(), 900);
}

#[test]
fn test_is_suitable_keeps_ledger() {
    let mut provisioner = SimpleIoProvisioner::new(1000);
    provisioner.allocate(1, 300, 1000);
    assert!(provisioner.is_suitable(1, 900, 1000));
    assert!(!provisioner.is_suitable(2, 800, 1000));
    assert_eq!(provisioner.allocated(1), 300);
    assert_eq!(provisioner.allocated(2), 0);
    assert_eq!(provisioner.available(), 700);

    provisioner.deallocate_all();
    assert_eq!(provisioner.available(), 1000);
}
